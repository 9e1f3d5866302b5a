use super::session::{install_cancel_watchers, load_config, run_session, SessionOptions, SessionSink};
use anyhow::{Context, Result};
use magsync_core::{CancelToken, DatagramTransport};
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};
use tracing::info;

pub fn execute(bind: Ipv4Addr, port: u16, options: &SessionOptions) -> Result<()> {
    let config = load_config(options.config.as_deref(), options.timeout_ms)?;
    let mut sink = SessionSink::open(options)?;

    let cancel = CancelToken::new();
    install_cancel_watchers(&cancel)?;

    let local = SocketAddrV4::new(bind, port);
    let socket = UdpSocket::bind(local).with_context(|| format!("Failed to bind {}", local))?;
    let transport = DatagramTransport::new(socket, config.read_timeout())
        .with_context(|| format!("Failed to configure socket on {}", local))?;

    info!("Listening on {}", transport.local_addr()?);
    println!("Listening on {}; press Enter or Ctrl-C to stop", local);

    let stats = run_session(transport, config, &mut sink, cancel)?;
    if let Some(captured) = sink.captured() {
        info!("Captured {} of {} records", captured, stats.records());
    }

    Ok(())
}
