// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive session: prompts from the host, lines from the terminal.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use rh_engine::{Nesting, Session, SessionError};

use crate::host::{HostArgs, HostSession};
use crate::terminal::{self, Terminal, TerminalCallbacks};

#[derive(Args)]
pub struct ReplArgs {
    #[command(flatten)]
    pub host: HostArgs,
}

pub async fn handle(args: ReplArgs) -> Result<()> {
    let terminal = Terminal::stdin();
    let callbacks = Arc::new(TerminalCallbacks::new(terminal.clone()));

    let host = HostSession::connect(&args.host).await?;
    let session = host.session().clone();
    let output = tokio::spawn(terminal::stream_output(session.subscribe()));

    if let Err(e) = host.start(&args.host, callbacks, None).await {
        host.close().await;
        return Err(e.into());
    }

    let interrupts = tokio::spawn({
        let session = session.clone();
        async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                eprintln!();
                session.cancel_all().await;
            }
        }
    });

    let result = prompt_loop(&session, &terminal).await;
    interrupts.abort();
    host.close().await;
    terminal::drain(output).await;
    result
}

/// Answer whichever prompt is innermost until the host exits or input ends.
async fn prompt_loop(session: &Session, terminal: &Terminal) -> Result<()> {
    loop {
        let interaction = match session.begin_interaction(Nesting::Reentrant, None).await {
            Ok(interaction) => interaction,
            Err(SessionError::Canceled) => continue,
            Err(SessionError::Disconnected) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let Some(line) = terminal.read_line(interaction.prompt_text()).await? else {
            println!();
            return Ok(());
        };
        match interaction.respond(&line) {
            Ok(()) | Err(SessionError::Canceled) => {}
            Err(SessionError::Disconnected) => return Ok(()),
            Err(e) => return Err(e.into()),
        }
    }
}
