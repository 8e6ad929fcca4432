use std::sync::Arc;

use tracing::{info, warn};
use westpipe_engine::{
    ChannelRenderSink, Engine, EngineConfig, EngineError, ExitReason, ModuleFactory,
};
use westpipe_transport::PipeConfig;

use crate::cmd::{parse_duration, HostArgs};
use crate::exit::{engine_error, CliError, CliResult, INTERNAL, SUCCESS, TRANSPORT_ERROR};
use crate::output::{print_event, print_report, OutputFormat};

pub fn run(args: HostArgs, format: OutputFormat) -> CliResult<i32> {
    let heartbeat_interval = parse_duration(&args.heartbeat)?;
    let pipe = pipe_config(&args);
    let config = EngineConfig {
        heartbeat_interval,
        forward_stray_output: args.forward_stray,
        require_config_terminator: !args.legacy_config,
        ..EngineConfig::default()
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("failed to start runtime: {err}")))?;

    runtime.block_on(host(pipe, config, format))
}

fn pipe_config(args: &HostArgs) -> PipeConfig {
    match (&args.path, &args.outbound) {
        (Some(path), Some(outbound)) => PipeConfig::dual(path, outbound),
        (Some(path), None) => PipeConfig::single(path),
        (None, outbound) => {
            let mut pipe = PipeConfig::default();
            pipe.outbound_path = outbound.clone();
            pipe
        }
    }
}

async fn host(pipe: PipeConfig, config: EngineConfig, format: OutputFormat) -> CliResult<i32> {
    let (sink, mut events) = ChannelRenderSink::channel();
    let printer = tokio::spawn(async move {
        let mut printed = 0u64;
        while let Some(event) = events.recv().await {
            print_event(&event, format);
            printed += 1;
        }
        printed
    });

    let engine = Engine::new(config, ModuleFactory::with_builtin())
        .with_render_sink(Arc::new(sink))
        .on_terminated(|reason| info!(%reason, "peer session ended"));

    let token = engine.cancellation_token();
    ctrlc::set_handler(move || token.cancel()).map_err(|err| {
        CliError::new(INTERNAL, format!("failed to install Ctrl-C handler: {err}"))
    })?;

    let handle = match engine.listen(&pipe).await {
        Ok(handle) => handle,
        Err(EngineError::Cancelled) => {
            info!("stopped before a peer connected");
            let _ = printer.await;
            return Ok(SUCCESS);
        }
        Err(err) => {
            let _ = printer.await;
            return Err(engine_error("listen failed", err));
        }
    };
    info!("peer connected");

    let report = handle
        .join()
        .await
        .map_err(|err| engine_error("engine failed", err))?;

    info!(
        reason = %report.reason,
        modules = report.registry.len(),
        ticks = report.stats.ticks,
        heartbeats = report.heartbeats,
        "host stopped"
    );
    print_report(&report, format);

    let code = match &report.reason {
        ExitReason::EndOfStream | ExitReason::Cancelled => SUCCESS,
        ExitReason::TransportFailed(err) => {
            warn!(error = %err, "inbound leg failed");
            TRANSPORT_ERROR
        }
    };

    // The registry holds the last render targets; dropping it closes the channel.
    drop(report);
    match printer.await {
        Ok(printed) => info!(snapshots = printed, "renderer drained"),
        Err(err) => warn!(error = %err, "renderer task failed"),
    }

    Ok(code)
}
