// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot evaluation.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use rh_engine::Nesting;
use tokio_util::sync::CancellationToken;

use crate::host::{HostArgs, HostSession};
use crate::output::{format_value, OutputFormat};
use crate::terminal::{self, Terminal, TerminalCallbacks};

#[derive(Args)]
pub struct EvalArgs {
    /// Code to evaluate
    pub code: String,

    #[command(flatten)]
    pub host: HostArgs,
}

pub async fn handle(args: EvalArgs, format: OutputFormat) -> Result<()> {
    let callbacks = Arc::new(TerminalCallbacks::new(Terminal::stdin()));
    let host = HostSession::connect(&args.host).await?;
    let output = tokio::spawn(terminal::stream_output(host.session().subscribe()));

    let cancel = CancellationToken::new();
    let interrupts = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let result = async {
        host.start(&args.host, callbacks, Some(&cancel)).await?;
        host.session()
            .evaluate(&args.code, Nesting::TopLevel, Some(&cancel))
            .await
    }
    .await;

    interrupts.abort();
    host.close().await;
    terminal::drain(output).await;

    let value = result?;
    println!("{}", format_value(&value, format));
    Ok(())
}
