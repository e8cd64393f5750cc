//! Interactive `cook` loop: stdin commands in, tool responses out.
//!
//! Each line is one tool call against a single session. Timer notices are
//! printed as they arrive, between commands.

use std::str::FromStr;

use anyhow::{Context, Result};
use log::{debug, warn};
use sous_core::{FinishedSession, RecipeDocument, SessionController, SessionNotice};
use tokio::{
    io::{AsyncBufReadExt, BufReader, Lines, Stdin},
    sync::broadcast::{self, error::RecvError},
};

use crate::renderer::TerminalRenderer;

const HELP: &str = "\
Commands:
  start [step]        start a step (defaults to the next ready step)
  done [step] [--force]
                      confirm the active step is done
  skip [step]         stop the active step's timer early
  state               show progress
  repeat              repeat the current instruction
  quit                end the session
";

/// One parsed line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookCommand {
    Start(Option<String>),
    Done { step_id: Option<String>, force: bool },
    Skip(Option<String>),
    State,
    Repeat,
    Help,
    Quit,
}

impl FromStr for CookCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err("empty command".to_string());
        };
        let rest: Vec<&str> = words.collect();
        let step = |args: &[&str]| args.first().map(|s| (*s).to_string());

        match verb {
            "start" | "s" => Ok(CookCommand::Start(step(&rest))),
            "done" | "d" => {
                let force = rest.contains(&"--force");
                let args: Vec<&str> = rest.into_iter().filter(|a| *a != "--force").collect();
                Ok(CookCommand::Done {
                    step_id: step(&args),
                    force,
                })
            }
            "skip" => Ok(CookCommand::Skip(step(&rest))),
            "state" | "status" => Ok(CookCommand::State),
            "repeat" | "r" => Ok(CookCommand::Repeat),
            "help" | "?" => Ok(CookCommand::Help),
            "quit" | "q" | "exit" => Ok(CookCommand::Quit),
            other => Err(format!("unknown command '{other}'; type `help`")),
        }
    }
}

/// A session driven from the terminal.
pub struct CookLoop<'a> {
    controller: &'a SessionController,
    renderer: &'a TerminalRenderer,
    session_id: String,
    notices: broadcast::Receiver<SessionNotice>,
}

impl<'a> CookLoop<'a> {
    pub async fn start(
        controller: &'a SessionController,
        renderer: &'a TerminalRenderer,
        recipe: RecipeDocument,
    ) -> Result<Self> {
        let title = recipe.title.clone();
        let session_id = controller
            .create_session(recipe)
            .await
            .context("Failed to create cooking session")?;
        let notices = controller.subscribe(&session_id)?;

        renderer.render(&format!(
            "# {title}\n\nSession {session_id} started. Type `help` for commands.\n\n"
        ))?;
        renderer.render_response(&controller.repeat_step(&session_id)?)?;

        Ok(Self {
            controller,
            renderer,
            session_id,
            notices,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        let mut lines: Lines<BufReader<Stdin>> = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                notice = self.notices.recv() => match notice {
                    Ok(notice) => {
                        self.renderer.render_response(&notice.response)?;
                        if self.finish_if_complete().await? {
                            return Ok(());
                        }
                    }
                    Err(RecvError::Lagged(missed)) => warn!("Missed {missed} timer notice(s)"),
                    Err(RecvError::Closed) => return Ok(()),
                },
                line = lines.next_line() => {
                    let Some(line) = line.context("Failed to read stdin")? else {
                        let finished = self.controller.abandon_session(&self.session_id).await?;
                        return self.renderer.render(&finished.to_string());
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match line.parse::<CookCommand>() {
                        Ok(CookCommand::Quit) => {
                            let finished = self.controller.finish_session(&self.session_id).await?;
                            return self.render_finished(&finished);
                        }
                        Ok(command) => {
                            if self.execute(command).await? {
                                return Ok(());
                            }
                        }
                        Err(e) => self.renderer.render(&format!("{e}\n"))?,
                    }
                }
            }
        }
    }

    /// Runs one command. Returns `true` once the session is over.
    async fn execute(&self, command: CookCommand) -> Result<bool> {
        debug!("cook <- {command:?}");
        let controller = self.controller;
        let id = self.session_id.as_str();

        let response = match command {
            CookCommand::Start(step_id) => match step_id.or_else(|| self.next_ready()) {
                Some(step_id) => controller.start_step(id, &step_id).await?,
                None => return self.say("No step is ready to start."),
            },
            CookCommand::Done { step_id, force } => match step_id.or_else(|| self.active()) {
                Some(step_id) => controller.confirm_step_done(id, &step_id, force).await?,
                None => return self.say("No step is active."),
            },
            CookCommand::Skip(step_id) => match step_id.or_else(|| self.active()) {
                Some(step_id) => controller.skip_timer(id, &step_id).await?,
                None => return self.say("No step is active."),
            },
            CookCommand::State => controller.get_state(id)?,
            CookCommand::Repeat => controller.repeat_step(id)?,
            CookCommand::Help => return self.say(HELP),
            CookCommand::Quit => return Ok(true),
        };
        self.renderer.render_response(&response)?;

        if controller.snapshot(id).is_err() {
            // Closed by the confirmation that completed the last step.
            return Ok(true);
        }
        self.finish_if_complete().await
    }

    async fn finish_if_complete(&self) -> Result<bool> {
        let complete = self
            .controller
            .snapshot(&self.session_id)
            .is_ok_and(|snapshot| snapshot.is_complete);
        if !complete {
            return Ok(false);
        }
        let finished = self.controller.finish_session(&self.session_id).await?;
        self.render_finished(&finished)?;
        Ok(true)
    }

    fn render_finished(&self, finished: &FinishedSession) -> Result<()> {
        self.renderer.render(&format!("\n{finished}"))
    }

    fn say(&self, text: &str) -> Result<bool> {
        self.renderer.render(&format!("{}\n", text.trim_end()))?;
        Ok(false)
    }

    fn active(&self) -> Option<String> {
        self.controller
            .snapshot(&self.session_id)
            .ok()
            .and_then(|snapshot| snapshot.active_step)
    }

    fn next_ready(&self) -> Option<String> {
        self.controller
            .snapshot(&self.session_id)
            .ok()
            .and_then(|snapshot| snapshot.ready.into_iter().next())
    }
}
