//! Line-delimited JSON transport.
//!
//! A named background thread reads server lines, decodes them and pushes
//! [`Inbound`] events into an unbounded channel. The driver thread owns the
//! writer and is the only one that touches the world model.

use std::collections::{BTreeSet, VecDeque};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::TcpStream;

use crossbeam_channel::{Receiver, Sender, bounded, select, unbounded};
use tracing::{debug, warn};

use crate::error::{ProtocolError, SessionError, TransportError};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::config::Endpoint;

/// Name of the receive thread.
const RECEIVER_THREAD: &str = "battlehack-recv";

/// Byte stream halves of an open connection.
pub(crate) type Streams = (Box<dyn Read + Send>, Box<dyn Write + Send>);

/// What the receive thread reports.
#[derive(Debug)]
pub(crate) enum Inbound {
    /// A decoded server message.
    Message(ServerMessage),
    /// The server says we were too slow on this turn.
    MissedTurn(u32),
    /// The stream failed or the server broke the protocol; nothing follows.
    Failed(SessionError),
    /// End of stream; nothing follows.
    Closed,
}

/// What [`Link::recv`] hands to the driver. Missed turns are recorded by the
/// link and never delivered.
#[derive(Debug)]
pub(crate) enum Event {
    /// A decoded server message.
    Message(ServerMessage),
    /// The stream failed or the server broke the protocol; nothing follows.
    Failed(SessionError),
    /// End of stream; nothing follows.
    Closed,
}

/// Open a connection to `endpoint`.
pub(crate) fn open(endpoint: &Endpoint) -> io::Result<Streams> {
    match endpoint {
        Endpoint::Tcp { host, port } => {
            let stream = TcpStream::connect((host.as_str(), *port))?;
            stream.set_nodelay(true)?;
            let reader = stream.try_clone()?;
            Ok((Box::new(reader), Box::new(stream)))
        }
        #[cfg(unix)]
        Endpoint::Unix(path) => {
            let stream = std::os::unix::net::UnixStream::connect(path)?;
            let reader = stream.try_clone()?;
            Ok((Box::new(reader), Box::new(stream)))
        }
        #[cfg(not(unix))]
        Endpoint::Unix(path) => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("unix sockets are unavailable: {}", path.display()),
        )),
    }
}

/// Write one message as a JSON line and flush.
pub(crate) fn send_message<W: Write + ?Sized>(
    writer: &mut W,
    message: &ClientMessage,
) -> Result<(), TransportError> {
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    writer.write_all(&line)?;
    writer.flush()?;
    Ok(())
}

/// Start the receive thread.
pub(crate) fn spawn_receiver(
    reader: Box<dyn Read + Send>,
    recorder: Option<Box<dyn Write + Send>>,
) -> io::Result<Receiver<Inbound>> {
    let (tx, rx) = unbounded();
    std::thread::Builder::new()
        .name(RECEIVER_THREAD.into())
        .spawn(move || receive_loop(BufReader::new(reader), &tx, recorder))?;
    Ok(rx)
}

/// Read lines until end of stream, a failure, or the driver going away.
pub(crate) fn receive_loop<R: BufRead>(
    reader: R,
    tx: &Sender<Inbound>,
    mut recorder: Option<Box<dyn Write + Send>>,
) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                let _ = tx.send(Inbound::Failed(TransportError::Io(e).into()));
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        if let Some(out) = recorder.as_mut() {
            if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
                warn!(error = %e, "transcript recording failed; disabling it");
                recorder = None;
            }
        }

        let event = match ServerMessage::decode(&line) {
            Ok(message) if message.is_wrong_turn_warning() => {
                warn!("server reported a wrong turn; speed up the bot");
                continue;
            }
            Ok(ServerMessage::Error { reason }) => {
                Inbound::Failed(ProtocolError::Server(reason).into())
            }
            Ok(ServerMessage::MissedTurn { turn }) => Inbound::MissedTurn(turn),
            Ok(message) => Inbound::Message(message),
            Err(e) => Inbound::Failed(e.into()),
        };
        let fatal = matches!(event, Inbound::Failed(_));
        if tx.send(event).is_err() || fatal {
            return;
        }
    }
    debug!("server closed the stream");
    let _ = tx.send(Inbound::Closed);
}

/// Signals a blocked driver to stop waiting.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Sender<()>,
}

impl CancelHandle {
    /// Wake the driver; its pending wait returns [`SessionError::Cancelled`].
    pub fn cancel(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Driver side of a connection: writer, inbox and missed-turn record.
pub(crate) struct Link {
    writer: Box<dyn Write + Send>,
    inbox: Receiver<Inbound>,
    buffered: VecDeque<Event>,
    cancel_tx: Sender<()>,
    cancel_rx: Receiver<()>,
    missed_turns: BTreeSet<u32>,
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("buffered", &self.buffered.len())
            .field("missed_turns", &self.missed_turns)
            .finish_non_exhaustive()
    }
}

impl Link {
    pub(crate) fn new(writer: Box<dyn Write + Send>, inbox: Receiver<Inbound>) -> Self {
        let (cancel_tx, cancel_rx) = bounded(1);
        Self {
            writer,
            inbox,
            buffered: VecDeque::new(),
            cancel_tx,
            cancel_rx,
            missed_turns: BTreeSet::new(),
        }
    }

    pub(crate) fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: self.cancel_tx.clone(),
        }
    }

    pub(crate) fn send(&mut self, message: &ClientMessage) -> Result<(), TransportError> {
        send_message(&mut self.writer, message)
    }

    fn accept(&mut self, inbound: Inbound) {
        let event = match inbound {
            Inbound::Message(message) => Event::Message(message),
            Inbound::Failed(e) => Event::Failed(e),
            Inbound::Closed => Event::Closed,
            Inbound::MissedTurn(turn) => {
                warn!(turn, "missed turn; speed up the bot");
                self.missed_turns.insert(turn);
                return;
            }
        };
        self.buffered.push_back(event);
    }

    /// Move everything already received into the local buffer.
    pub(crate) fn poll(&mut self) {
        while let Ok(event) = self.inbox.try_recv() {
            self.accept(event);
        }
    }

    /// True if more events are waiting to be processed.
    pub(crate) fn can_recv_more(&mut self) -> bool {
        self.poll();
        !self.buffered.is_empty()
    }

    /// True if the server reported `turn` as missed.
    pub(crate) fn is_missed(&mut self, turn: u32) -> bool {
        self.poll();
        self.missed_turns.contains(&turn)
    }

    pub(crate) fn missed_turns(&self) -> impl Iterator<Item = u32> + '_ {
        self.missed_turns.iter().copied()
    }

    /// Block until the next event or a cancellation.
    pub(crate) fn recv(&mut self) -> Result<Event, SessionError> {
        loop {
            if let Some(event) = self.buffered.pop_front() {
                return Ok(event);
            }
            let event = select! {
                recv(self.inbox) -> event => event.ok(),
                recv(self.cancel_rx) -> _ => return Err(SessionError::Cancelled),
            };
            match event {
                Some(event) => self.accept(event),
                None => return Ok(Event::Closed),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn drain(input: &str) -> Vec<Inbound> {
        let (tx, rx) = unbounded();
        receive_loop(Cursor::new(input.to_string()), &tx, None);
        drop(tx);
        rx.iter().collect()
    }

    #[test]
    fn test_receive_loop_filters_warnings() {
        let events = drain(concat!(
            "{\"command\":\"loginConfirm\",\"teamID\":1}\n",
            "\n",
            "{\"command\":\"error\",\"reason\":\"wrong turn 3\"}\n",
            "{\"command\":\"missedTurn\",\"turn\":3}\n",
        ));
        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[0],
            Inbound::Message(ServerMessage::LoginConfirm { team_id: 1 })
        ));
        assert!(matches!(events[1], Inbound::MissedTurn(3)));
        assert!(matches!(events[2], Inbound::Closed));
    }

    #[test]
    fn test_receive_loop_stops_on_fatal_error() {
        let events = drain(concat!(
            "{\"command\":\"error\",\"reason\":\"invalid login\"}\n",
            "{\"command\":\"loginConfirm\",\"teamID\":1}\n",
        ));
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            Inbound::Failed(SessionError::Protocol(ProtocolError::Server(reason))) if reason == "invalid login"
        ));
    }

    #[test]
    fn test_receive_loop_stops_on_garbage() {
        let events = drain("{\"command\":\"teleport\"}\n{\"command\":\"loginConfirm\",\"teamID\":1}\n");
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            Inbound::Failed(SessionError::Protocol(ProtocolError::Malformed { .. }))
        ));
    }

    #[test]
    fn test_link_records_missed_turns() {
        let (tx, rx) = unbounded();
        let mut link = Link::new(Box::new(io::sink()), rx);
        tx.send(Inbound::MissedTurn(4)).unwrap();
        tx.send(Inbound::Closed).unwrap();
        assert!(link.is_missed(4));
        assert!(!link.is_missed(5));
        assert!(link.can_recv_more());
        assert!(matches!(link.recv().unwrap(), Event::Closed));
        assert!(!link.can_recv_more());
    }

    #[test]
    fn test_missed_turn_is_never_delivered() {
        let (tx, rx) = unbounded();
        let mut link = Link::new(Box::new(io::sink()), rx);
        tx.send(Inbound::MissedTurn(2)).unwrap();
        tx.send(Inbound::Message(ServerMessage::LoginConfirm { team_id: 1 }))
            .unwrap();
        tx.send(Inbound::MissedTurn(3)).unwrap();
        drop(tx);
        assert!(matches!(
            link.recv().unwrap(),
            Event::Message(ServerMessage::LoginConfirm { team_id: 1 })
        ));
        assert!(matches!(link.recv().unwrap(), Event::Closed));
        assert_eq!(link.missed_turns().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_link_cancel() {
        let (_tx, rx) = unbounded::<Inbound>();
        let mut link = Link::new(Box::new(io::sink()), rx);
        link.cancel_handle().cancel();
        assert!(matches!(link.recv(), Err(SessionError::Cancelled)));
    }

    #[test]
    fn test_send_message_writes_one_line() {
        let mut out = Vec::new();
        send_message(&mut out, &ClientMessage::MakeTurn { turn: 2, actions: vec![] }).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\"command\":\"makeTurn\",\"turn\":2,\"actions\":[]}\n"
        );
    }
}
