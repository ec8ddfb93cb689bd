//! Dev watcher: open a view session against a running admin API and print
//! the execution timeline until everything reaches a terminal phase.
//!
//! ```text
//! FLOWDECK_ADMIN_URL=http://localhost:30080 \
//!     cargo run --example watch -- <project> <domain> <execution-name>
//! ```

use std::sync::Arc;

use anyhow::Context;

use fd_admin::client::HttpAdminClient;
use fd_admin::config::AdminConfig;
use fd_core::execution::WorkflowExecutionId;
use fd_sync::poll::Poller;
use fd_sync::session::ExecutionTreeSession;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let (project, domain, name) = match (args.next(), args.next(), args.next()) {
        (Some(p), Some(d), Some(n)) => (p, d, n),
        _ => anyhow::bail!("usage: watch <project> <domain> <execution-name>"),
    };

    let config = AdminConfig::from_env();
    let client = Arc::new(HttpAdminClient::new(&config).context("building admin client")?);
    let session = ExecutionTreeSession::open(
        client,
        WorkflowExecutionId {
            project,
            domain,
            name,
        },
    )
    .await
    .context("opening execution view")?;

    let poller = Poller::spawn(session.clone(), config.poll_interval());

    loop {
        let execution = session.execution().await;
        println!("{} [{:?}]", execution.id.name, execution.closure.phase);
        for row in session.timeline().await {
            println!(
                "  {:indent$}{} {} {}ms",
                "",
                row.name,
                row.phase.as_str(),
                row.duration_ms.unwrap_or(0),
                indent = row.depth * 2
            );
        }
        if poller.is_finished() {
            break;
        }
        tokio::time::sleep(config.poll_interval()).await;
    }

    poller.join().await;
    session.close().await;
    Ok(())
}
