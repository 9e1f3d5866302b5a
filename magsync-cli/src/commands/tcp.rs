use super::session::{install_cancel_watchers, load_config, run_session, SessionOptions, SessionSink};
use anyhow::{Context, Result};
use magsync_core::{CancelToken, StreamTransport};
use std::net::{Ipv4Addr, SocketAddrV4, TcpStream};
use tracing::info;

pub fn execute(addr: Ipv4Addr, port: u16, options: &SessionOptions) -> Result<()> {
    let config = load_config(options.config.as_deref(), options.timeout_ms)?;
    let mut sink = SessionSink::open(options)?;

    let cancel = CancelToken::new();
    install_cancel_watchers(&cancel)?;

    let target = SocketAddrV4::new(addr, port);
    info!("Connecting to {}", target);

    let stream = TcpStream::connect(target)
        .with_context(|| format!("Failed to connect to {}", target))?;
    let transport = StreamTransport::tcp(stream, config.read_timeout())
        .with_context(|| format!("Failed to configure connection to {}", target))?;

    println!("Connected to {}; press Enter or Ctrl-C to stop", target);

    let stats = run_session(transport, config, &mut sink, cancel)?;
    if let Some(captured) = sink.captured() {
        info!("Captured {} of {} records", captured, stats.records());
    }

    Ok(())
}
