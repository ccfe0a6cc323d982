//! `conclave run`: starts the swarm and drives it until interrupted.

use clap::Args;

use crate::application::Swarm;
use crate::cli::commands::CliContext;

#[derive(Args, Debug)]
pub struct RunArgs {}

pub async fn run(_args: RunArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let swarm = Swarm::new(
        ctx.config.clone(),
        ctx.task_store.clone(),
        ctx.agent_store.clone(),
        ctx.cycle_store.clone(),
        ctx.verdict_store.clone(),
        ctx.model.clone(),
        ctx.fs_exec.clone(),
        ctx.vcs.clone(),
        ctx.clock.clone(),
    );

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    swarm.run(shutdown).await?;
    Ok(())
}
