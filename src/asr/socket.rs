//! Websocket worker for the side channel.
//!
//! The socket lives on its own thread; the event loop only sees
//! [`SideChannelEvent`]s and pushes [`ClientFrame`]s through a channel.

use super::{ClientFrame, ConnectionId};
use crate::channel::OutboundFrame;
use crate::log_debug;
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use std::io::ErrorKind;
use std::net::TcpStream;
use std::thread;
use std::time::Duration;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};
use url::Url;

/// How long a blocking read waits before the worker checks for outbound frames.
const READ_POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideChannelEventKind {
    Opened,
    /// Raw server text frame.
    Message(String),
    Closed,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideChannelEvent {
    pub conn: ConnectionId,
    pub kind: SideChannelEventKind,
}

/// Handle to a running side-channel socket.
///
/// Dropping the handle closes the outbound queue; the worker then sends a
/// close frame and exits on its own. Events it reports afterwards carry a
/// stale [`ConnectionId`].
pub struct WsSideChannel {
    conn: ConnectionId,
    outbound: Sender<ClientFrame>,
}

impl WsSideChannel {
    pub fn spawn<F>(conn: ConnectionId, url: Url, notify: F) -> Self
    where
        F: Fn(SideChannelEvent) + Send + 'static,
    {
        let (outbound, queue) = unbounded();
        let spawn_result = thread::Builder::new()
            .name(format!("{conn}"))
            .spawn(move || run_worker(conn, url, queue, notify));
        if let Err(err) = spawn_result {
            log_debug(&format!("failed to spawn side-channel worker: {err}"));
        }
        Self { conn, outbound }
    }

    pub fn conn(&self) -> ConnectionId {
        self.conn
    }

    /// Queue a frame; false once the worker has gone away.
    pub fn send(&self, frame: ClientFrame) -> bool {
        self.outbound.send(frame).is_ok()
    }
}

fn run_worker<F>(conn: ConnectionId, url: Url, queue: Receiver<ClientFrame>, notify: F)
where
    F: Fn(SideChannelEvent) + Send + 'static,
{
    let emit = |kind| notify(SideChannelEvent { conn, kind });
    let mut socket = match tungstenite::connect(url.as_str()) {
        Ok((socket, _response)) => socket,
        Err(err) => {
            emit(SideChannelEventKind::Error(err.to_string()));
            return;
        }
    };
    if let Err(err) = set_read_timeout(&mut socket, READ_POLL) {
        log_debug(&format!("{conn}: failed to set read timeout: {err}"));
    }
    emit(SideChannelEventKind::Opened);

    loop {
        loop {
            match queue.try_recv() {
                Ok(frame) => {
                    if let Err(err) = send_frame(&mut socket, &frame) {
                        emit(SideChannelEventKind::Error(err.to_string()));
                        return;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    let _ = socket.close(None);
                    let _ = socket.flush();
                    log_debug(&format!("{conn}: closed by client"));
                    return;
                }
            }
        }

        match socket.read() {
            Ok(Message::Text(text)) => emit(SideChannelEventKind::Message(text)),
            Ok(Message::Close(_)) => {
                emit(SideChannelEventKind::Closed);
                return;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(err))
                if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                emit(SideChannelEventKind::Closed);
                return;
            }
            Err(err) => {
                emit(SideChannelEventKind::Error(err.to_string()));
                return;
            }
        }
    }
}

fn send_frame(
    socket: &mut WebSocket<MaybeTlsStream<TcpStream>>,
    frame: &ClientFrame,
) -> anyhow::Result<()> {
    let message = match frame.encode()? {
        OutboundFrame::Text(text) => Message::Text(text),
        OutboundFrame::Binary(bytes) => Message::Binary(bytes),
    };
    socket.send(message)?;
    Ok(())
}

fn set_read_timeout(
    socket: &mut WebSocket<MaybeTlsStream<TcpStream>>,
    timeout: Duration,
) -> std::io::Result<()> {
    match socket.get_mut() {
        MaybeTlsStream::Plain(stream) => stream.set_read_timeout(Some(timeout)),
        MaybeTlsStream::NativeTls(stream) => stream.get_mut().set_read_timeout(Some(timeout)),
        _ => Ok(()),
    }
}
