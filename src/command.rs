use std::io::Write;

use tracing::{error, info, warn};

use crate::constants::MAX_AGENTS;
use crate::errors::ParseError;
use crate::nodes::coordinator::QueryCoordinator;
use crate::nodes::session::SessionController;
use crate::persistence::Registry;
use crate::transport::Transport;
use crate::types::StartParams;

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Start(StartParams),
    Play,
    Stop,
}

/// Parse one input line. `start` takes exactly
/// `start --value V --max-value MAX --num-agents N --liar-ratio R`;
/// `play` and `stop` ignore anything after the command word.
pub fn parse(line: &str) -> Result<Command, ParseError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.first() {
        None => Err(ParseError::Empty),
        Some(&"start") => parse_start(&tokens).map(Command::Start),
        Some(&"play") => Ok(Command::Play),
        Some(&"stop") => Ok(Command::Stop),
        Some(other) => Err(ParseError::Unknown(other.to_string())),
    }
}

fn parse_start(tokens: &[&str]) -> Result<StartParams, ParseError> {
    if tokens.len() != 9 {
        return Err(ParseError::TokenCount);
    }
    if tokens[1] != "--value"
        || tokens[3] != "--max-value"
        || tokens[5] != "--num-agents"
        || tokens[7] != "--liar-ratio"
    {
        return Err(ParseError::Keys);
    }

    let network_value = parse_value(tokens[2], "v")?;
    let max_value = parse_value(tokens[4], "max")?;
    let num_agents = tokens[6]
        .parse::<usize>()
        .ok()
        .filter(|&n| n <= MAX_AGENTS)
        .ok_or(ParseError::Integer {
            field: "number of agents",
            max: MAX_AGENTS as u64,
        })?;
    let liar_ratio: f64 = tokens[8].parse().map_err(|_| ParseError::Ratio)?;
    if !(0.0..=1.0).contains(&liar_ratio) {
        return Err(ParseError::Ratio);
    }

    Ok(StartParams {
        network_value,
        max_value,
        num_agents,
        liar_ratio,
    })
}

fn parse_value(token: &str, field: &'static str) -> Result<u32, ParseError> {
    token.parse().map_err(|_| ParseError::Integer {
        field,
        max: u64::from(u32::MAX),
    })
}

/// Whether the command loop should keep reading.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Executes commands against one session controller. Protocol output
/// (`ready`, the network value) goes to `out`; everything else is logged.
pub struct Shell<R, T> {
    sessions: SessionController<R>,
    coordinator: QueryCoordinator<T>,
}

impl<R, T> Shell<R, T>
where
    R: Registry,
    T: Transport + Send + Sync + 'static,
{
    pub fn new(sessions: SessionController<R>, coordinator: QueryCoordinator<T>) -> Self {
        Shell {
            sessions,
            coordinator,
        }
    }

    pub async fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> anyhow::Result<Flow> {
        let command = match parse(line) {
            Ok(command) => command,
            Err(e) => {
                error!("{}", e);
                return Ok(Flow::Continue);
            }
        };

        match command {
            Command::Start(params) => match self.sessions.start(params).await {
                Ok(_) => writeln!(out, "ready")?,
                Err(e) => error!("start failed: {:#}", e),
            },
            Command::Play => match self.coordinator.play_round(self.sessions.registry()).await {
                Ok(Some(value)) => writeln!(out, "The network value is {}", value)?,
                Ok(None) => warn!("no agents registered"),
                Err(e) => error!("{}", e),
            },
            Command::Stop => {
                self.shutdown().await?;
                return Ok(Flow::Exit);
            }
        }
        out.flush()?;
        Ok(Flow::Continue)
    }

    /// Stop the running session and clear the registry.
    pub async fn shutdown(&mut self) -> anyhow::Result<()> {
        self.sessions.stop().await?;
        info!("session stopped");
        Ok(())
    }
}
