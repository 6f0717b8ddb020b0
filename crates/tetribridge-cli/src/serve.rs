use std::{
    io::BufReader,
    net::{SocketAddr, TcpListener, TcpStream},
    sync::Mutex,
    thread,
};

use anyhow::Context;

use tetribridge_agent::{
    DecisionSelector, Effect, GameEngine, OracleClient, PolicyEstimator, Session,
};
use tetribridge_engine::Replica;
use tetribridge_mlp::MlpEstimator;
use tetribridge_protocol::{EmulatorMessage, FrameError, emulator};

use crate::Args;

type SharedOracle = Mutex<OracleClient<TcpStream>>;

pub(crate) fn run(args: &Args) -> anyhow::Result<()> {
    let estimator = MlpEstimator::load(&args.model)
        .with_context(|| format!("loading checkpoint {}", args.model.display()))?;
    // Warm the estimator up before accepting traffic, so the first piece
    // of the first game is not late.
    estimator.evaluate(&Replica::new().observation());

    let oracle = match &args.oracle {
        Some(addr) => {
            let stream = TcpStream::connect(addr)
                .with_context(|| format!("connecting to oracle {addr}"))?;
            log(&format!("oracle connected at {addr}"));
            Some(Mutex::new(OracleClient::new(stream)))
        }
        None => None,
    };

    let listener = TcpListener::bind((args.bind.as_str(), args.port))
        .with_context(|| format!("binding {}:{}", args.bind, args.port))?;
    log(&format!("ready, listening on {}:{}", args.bind, args.port));

    thread::scope(|scope| {
        for connection in listener.incoming() {
            match connection {
                Ok(stream) => {
                    let estimator = &estimator;
                    let oracle = oracle.as_ref();
                    scope.spawn(move || handle_connection(&stream, estimator, oracle));
                }
                Err(err) => log(&format!("accept failed: {err}")),
            }
        }
    });
    Ok(())
}

/// Serves one emulator connection to completion on its own thread.
///
/// Every failure is confined to this connection: the listener and the
/// other sessions are unaffected.
fn handle_connection(
    stream: &TcpStream,
    estimator: &MlpEstimator,
    oracle: Option<&SharedOracle>,
) {
    let peer = peer_name(stream);
    log(&format!("{peer} connected"));
    match serve_session(stream, estimator, oracle) {
        Ok(()) => log(&format!("{peer} disconnected")),
        Err(err) => log(&format!("{peer} session ended: {err}")),
    }
}

fn serve_session(
    stream: &TcpStream,
    estimator: &MlpEstimator,
    oracle: Option<&SharedOracle>,
) -> anyhow::Result<()> {
    let selector = DecisionSelector::new(estimator, oracle);
    let mut session = Session::new(Replica::new(), selector);
    let mut reader = BufReader::new(stream);
    let mut writer = stream;
    loop {
        let message = match emulator::read_message(&mut reader) {
            Ok(message) => message,
            Err(FrameError::PeerClosed) => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        if let EmulatorMessage::NewGame { current, next } = message {
            log(&format!(
                "new game ({}, {})",
                current.as_char(),
                next.as_char()
            ));
        }
        for effect in session.handle(&message)? {
            match effect {
                Effect::Sequence(sequence) => emulator::write_sequence(&mut writer, &sequence)?,
                Effect::Report(report) => print!("{report}"),
                Effect::Mismatch { reported, expected } => match expected {
                    Some(expected) => eprintln!(
                        "error: unexpected placement {reported}; expected {expected}"
                    ),
                    None => eprintln!("error: unexpected placement {reported} before any game"),
                },
            }
        }
    }
}

fn peer_name(stream: &TcpStream) -> String {
    stream
        .peer_addr()
        .as_ref()
        .map_or_else(|_| "<unknown peer>".to_owned(), SocketAddr::to_string)
}

fn log(message: &str) {
    println!(
        "[{}] {message}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
}
