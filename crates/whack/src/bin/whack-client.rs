//! Terminal client: prints what the server sends and turns cell numbers
//! typed on stdin into `WHACK` requests.
//!
//! ```text
//! whack-client <host> <port>
//! ```

use std::process::ExitCode;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use whack::prelude::*;
use whack::transport::{TcpLineReader, TcpLineWriter, TransportError};

#[derive(Parser, Debug)]
#[command(author, version, about = "Whack-a-mole terminal client")]
struct Args {
    /// Server host
    host: String,
    /// Server port
    port: u16,
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), WhackError> {
    let conn = TcpLineConnection::connect(&format!("{}:{}", args.host, args.port)).await?;
    let (mut reader, writer) = conn.split();

    let (player_id, cols) = wait_for_welcome(&mut reader).await?;
    println!("you are player {}; type a cell number and press enter", player_id.0);

    let input = tokio::spawn(forward_stdin(writer, player_id));
    while let Some(line) = reader.recv_line().await? {
        match LineCodec.decode_server(&line) {
            Ok(msg) => {
                show(&msg, cols);
                if msg.is_terminal() {
                    break;
                }
            }
            Err(e) => tracing::warn!(error = %e, %line, "undecodable line from server"),
        }
    }
    input.abort();
    Ok(())
}

/// Returns this client's id and the board width.
async fn wait_for_welcome(reader: &mut TcpLineReader) -> Result<(PlayerId, u32), WhackError> {
    loop {
        let Some(line) = reader.recv_line().await? else {
            return Err(TransportError::Closed("closed before WELCOME".into()).into());
        };
        let msg = LineCodec.decode_server(&line)?;
        show(&msg, 0);
        if let ServerMessage::Welcome { player_id, cols, .. } = msg {
            return Ok((player_id, cols));
        }
    }
}

async fn forward_stdin(mut writer: TcpLineWriter, player: PlayerId) -> Result<(), WhackError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let Ok(cell) = input.parse::<u32>() else {
            eprintln!("not a cell number: {input}");
            continue;
        };
        let request = ClientMessage::Whack {
            cell: CellId(cell),
            player,
        };
        writer.send_line(&LineCodec.encode_client(&request)).await?;
    }
    Ok(())
}

/// Prints one server message. `cols` is zero until the board is known.
fn show(msg: &ServerMessage, cols: u32) {
    let at = |cell: &CellId| match cols {
        0 => format!("{}", cell.0),
        _ => {
            let (row, col) = cell.coords(cols);
            format!("{} (row {row}, col {col})", cell.0)
        }
    };
    match msg {
        ServerMessage::Welcome {
            rows,
            cols,
            players,
            player_id,
        } => println!("welcome: {rows}x{cols} board, {players} players, you are {player_id}"),
        ServerMessage::MoleUp(cell) => println!("mole up    {}", at(cell)),
        ServerMessage::MoleDown(cell) => println!("mole down  {}", at(cell)),
        ServerMessage::Score {
            score,
            player: Some(player),
        } => println!("score      {player}: {score}"),
        ServerMessage::Score {
            score,
            player: None,
        } => println!("score      {score}"),
        ServerMessage::Outcome(outcome) => println!("game over: you {outcome}"),
        ServerMessage::Error(message) => println!("server error: {message}"),
    }
}
