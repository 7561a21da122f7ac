use clap::Parser;
use spire_operator::config::{Cli, Commands};
use spire_operator::{Error, Result, controller};
use tokio::task::JoinError;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_subscriber();
    let cancel = tokio_util::sync::CancellationToken::new();
    match cli.command {
        Commands::Controller(controller_args) => {
            let mut controller_handle =
                tokio::spawn(controller::start(controller_args, cancel.child_token()));
            let mut shutdown_handle = tokio::spawn(async move { shutdown_signal().await });
            // watch for shutdown and errors
            tokio::select! {
                h = &mut controller_handle => exit("controller", h)?,
                _ = &mut shutdown_handle => {
                        cancel.cancel();
                        exit("controller", controller_handle.await)?;
                    },
            };
            info!("Exiting...");
        }
        Commands::Crdgen => spire_operator_crds::crd_gen_all()?,
    }
    Ok(())
}

fn setup_subscriber() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "spire_operator=info,spire_operator_authority=info,\
                 spire_operator_spiffeid_controller=info,spire_operator_pod_controller=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };
    tokio::select! {
        _ = ctrl_c => {
          info!("captured ctrl_c signal");
        },
        _ = terminate => {},
    }
}

fn exit(task: &str, out: Result<Result<()>, JoinError>) -> Result<()> {
    match out {
        Ok(Ok(_)) => {
            info!("{task} exited");
            Ok(())
        }
        Ok(Err(e)) => {
            error!("{task} failed with error: {e}");
            Err(e)
        }
        Err(e) => {
            error!("{task} task failed to complete: {e}");
            Err(Error::Task(e.to_string()))
        }
    }
}
