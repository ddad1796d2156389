use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHeader};
use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt, channel::mpsc};
use http_body::{Body, Frame, SizeHint};
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{error, info, warn};

/// Creates the two halves of a request body stream.
///
/// The [`ReqBody`] goes to the handler; the [`BodySender`] stays with the connection and
/// reads payload items from `payload_stream` only when the handler asks for the next chunk.
pub fn body_channel<S>(payload_stream: &mut S, payload_size: PayloadSize) -> (ReqBody, BodySender<'_, S>)
where
    S: Stream<Item = Result<Message<(RequestHeader, PayloadSize)>, ParseError>> + Unpin,
{
    let (signal_sender, signal_receiver) = mpsc::channel(8);
    let (data_sender, data_receiver) = mpsc::channel(8);

    let body_sender = BodySender {
        payload_stream,
        signal_receiver,
        data_sender,
        payload_size,
        eof: payload_size.is_empty(),
        demanded: false,
        received: 0,
    };
    let req_body = ReqBody { signal_sender, data_receiver, payload_size, in_flight: false, done: payload_size.is_empty() };

    (req_body, body_sender)
}

#[derive(Debug)]
pub(crate) enum BodyRequestSignal {
    RequestData,
}

/// The connection side of a request body.
///
/// Runs concurrently with the handler: every data request from the [`ReqBody`] pulls one
/// payload item off the connection. Once the handler drops its body the rest of the payload
/// stays unread; [`BodySender::skip_data_within`] moves the connection past it.
#[derive(Debug)]
pub struct BodySender<'conn, S> {
    payload_stream: &'conn mut S,
    signal_receiver: mpsc::Receiver<BodyRequestSignal>,
    data_sender: mpsc::Sender<Result<PayloadItem, ParseError>>,
    payload_size: PayloadSize,
    eof: bool,
    // a chunk request taken by `wait_demand` and not served yet
    demanded: bool,
    received: u64,
}

impl<S> BodySender<'_, S>
where
    S: Stream<Item = Result<Message<(RequestHeader, PayloadSize)>, ParseError>> + Unpin,
{
    /// Serves chunk requests until the end of the body or until the [`ReqBody`] is dropped.
    ///
    /// Returns an error only when the payload itself could not be read, e.g. the peer
    /// disconnected mid-body. The same error is forwarded to the [`ReqBody`] first.
    pub async fn start(&mut self) -> Result<(), ParseError> {
        if self.eof {
            return Ok(());
        }

        loop {
            if !self.demanded && self.signal_receiver.next().await.is_none() {
                break;
            }
            self.demanded = false;

            match self.read_data().await {
                Ok(payload_item) => {
                    self.eof = payload_item.is_eof();
                    if self.data_sender.send(Ok(payload_item)).await.is_err() {
                        // the body was dropped while a chunk was in flight
                        break;
                    }

                    if self.eof {
                        return Ok(());
                    }
                }

                Err(e) => {
                    error!(cause = %e, "failed to read request body");
                    let reported = replicate(&e);
                    if self.data_sender.send(Err(e)).await.is_err() {
                        warn!("request body dropped before the read error was delivered");
                    }
                    return Err(reported);
                }
            }
        }

        Ok(())
    }

    /// Waits until the [`ReqBody`] asks for its first chunk, without reading anything.
    ///
    /// Returns `false` when the body was dropped before asking, or has nothing to read.
    /// The request is kept and served by the next [`BodySender::start`].
    pub async fn wait_demand(&mut self) -> bool {
        if self.demanded {
            return true;
        }
        if self.eof {
            return false;
        }

        match self.signal_receiver.next().await {
            Some(BodyRequestSignal::RequestData) => {
                self.demanded = true;
                true
            }
            None => false,
        }
    }

    /// Reads and discards the remaining payload items up to the end signal, giving up once
    /// more than `max` bytes were skipped.
    ///
    /// Returns whether the end signal was reached; when it was not, the connection is no
    /// longer at a message boundary and must not serve another request.
    pub async fn skip_data_within(&mut self, max: u64) -> Result<bool, ParseError> {
        if self.eof {
            return Ok(true);
        }

        let mut size: u64 = 0;
        loop {
            let payload_item = self.read_data().await?;
            match payload_item {
                PayloadItem::Chunk(bytes) => {
                    size += bytes.len() as u64;
                    if size > max {
                        warn!(size, max, "request body too large to skip");
                        return Ok(false);
                    }
                }
                PayloadItem::Eof => {
                    self.eof = true;
                    if size > 0 {
                        info!(size, "skip request body");
                    }
                    return Ok(true);
                }
            }
        }
    }

    /// Whether the end signal of this body has been read off the connection.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// The body bytes still to come, when the body declared its length.
    pub fn remaining(&self) -> Option<u64> {
        match self.payload_size {
            _ if self.eof => Some(0),
            PayloadSize::Length(length) => Some(length.saturating_sub(self.received)),
            PayloadSize::Chunked => None,
            PayloadSize::Empty => Some(0),
        }
    }

    async fn read_data(&mut self) -> Result<PayloadItem, ParseError> {
        match self.payload_stream.next().await {
            Some(Ok(Message::Payload(payload_item))) => {
                if let Some(bytes) = payload_item.as_bytes() {
                    self.received += bytes.len() as u64;
                }
                Ok(payload_item)
            }
            Some(Ok(Message::Header(_))) => {
                error!("received header while reading request body");
                Err(ParseError::invalid_body("received header while reading request body"))
            }
            Some(Err(e)) => Err(e),
            None => Err(ParseError::connection_aborted(self.received)),
        }
    }
}

fn replicate(e: &ParseError) -> ParseError {
    match e {
        ParseError::ConnectionAborted { received } => ParseError::connection_aborted(*received),
        e => ParseError::invalid_body(e.to_string()),
    }
}

/// The handler side of a request body, an `http_body::Body` of the request's chunks.
///
/// Frames are the chunks as they arrived; the stream ends with `None` at the end signal.
/// If the connection breaks first, the stream yields a [`ParseError::ConnectionAborted`].
#[derive(Debug)]
pub struct ReqBody {
    signal_sender: mpsc::Sender<BodyRequestSignal>,
    data_receiver: mpsc::Receiver<Result<PayloadItem, ParseError>>,
    payload_size: PayloadSize,
    in_flight: bool,
    done: bool,
}

impl ReqBody {
    pub fn payload_size(&self) -> PayloadSize {
        self.payload_size
    }
}

impl Body for ReqBody {
    type Data = Bytes;
    type Error = ParseError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();

        if this.done {
            return Poll::Ready(None);
        }

        if !this.in_flight {
            match Pin::new(&mut this.signal_sender).poll_ready(cx) {
                Poll::Ready(Ok(())) => {
                    if let Err(e) = Pin::new(&mut this.signal_sender).start_send(BodyRequestSignal::RequestData) {
                        error!(cause = %e, "failed to request body data");
                        this.done = true;
                        return Poll::Ready(Some(Err(ParseError::invalid_body("body sender has gone"))));
                    }
                    this.in_flight = true;
                }
                Poll::Ready(Err(e)) => {
                    error!(cause = %e, "failed to request body data");
                    this.done = true;
                    return Poll::Ready(Some(Err(ParseError::invalid_body("body sender has gone"))));
                }
                Poll::Pending => return Poll::Pending,
            }
        }

        let polled = match this.data_receiver.poll_next_unpin(cx) {
            Poll::Ready(polled) => polled,
            Poll::Pending => return Poll::Pending,
        };

        this.in_flight = false;
        match polled {
            Some(Ok(PayloadItem::Chunk(bytes))) => Poll::Ready(Some(Ok(Frame::data(bytes)))),
            Some(Ok(PayloadItem::Eof)) => {
                this.done = true;
                Poll::Ready(None)
            }
            Some(Err(e)) => {
                this.done = true;
                Poll::Ready(Some(Err(e)))
            }
            None => {
                this.done = true;
                Poll::Ready(Some(Err(ParseError::invalid_body("body stream closed before the end of the body"))))
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.done
    }

    fn size_hint(&self) -> SizeHint {
        self.payload_size.into()
    }
}

impl From<PayloadSize> for SizeHint {
    fn from(payload_size: PayloadSize) -> Self {
        match payload_size {
            PayloadSize::Length(length) => SizeHint::with_exact(length),
            PayloadSize::Chunked => SizeHint::new(),
            PayloadSize::Empty => SizeHint::with_exact(0),
        }
    }
}

impl From<SizeHint> for PayloadSize {
    fn from(size_hint: SizeHint) -> Self {
        match size_hint.exact() {
            Some(0) => PayloadSize::new_empty(),
            Some(length) => PayloadSize::new_length(length),
            None => PayloadSize::new_chunked(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use http_body_util::BodyExt;

    type Item = Result<Message<(RequestHeader, PayloadSize)>, ParseError>;

    fn chunk(bytes: &'static [u8]) -> Item {
        Ok(Message::Payload(PayloadItem::Chunk(Bytes::from_static(bytes))))
    }

    fn eof() -> Item {
        Ok(Message::Payload(PayloadItem::Eof))
    }

    #[tokio::test]
    async fn streams_chunks_in_order() {
        let mut payload = stream::iter(vec![chunk(b"hello"), chunk(b", "), chunk(b"world"), eof()]);
        let (body, mut sender) = body_channel(&mut payload, PayloadSize::Chunked);

        let (collected, sent) = tokio::join!(body.collect(), sender.start());

        assert!(sent.is_ok());
        assert_eq!(collected.unwrap().to_bytes(), Bytes::from_static(b"hello, world"));
        assert!(sender.is_eof());
    }

    #[tokio::test]
    async fn empty_body_never_touches_the_stream() {
        let mut payload = stream::iter(Vec::<Item>::new());
        let (mut body, mut sender) = body_channel(&mut payload, PayloadSize::Empty);

        assert!(body.is_end_stream());
        assert!(body.frame().await.is_none());
        assert!(sender.start().await.is_ok());
    }

    #[tokio::test]
    async fn disconnect_is_reported_as_aborted() {
        let mut payload = stream::iter(vec![chunk(b"{\"name\":")]);
        let (body, mut sender) = body_channel(&mut payload, PayloadSize::Length(20));

        let (collected, sent) = tokio::join!(body.collect(), sender.start());

        assert!(matches!(collected, Err(ParseError::ConnectionAborted { received: 8 })));
        assert!(matches!(sent, Err(ParseError::ConnectionAborted { received: 8 })));
    }

    #[tokio::test]
    async fn demand_is_kept_for_start() {
        let mut payload = stream::iter(vec![chunk(b"abc"), eof()]);
        let (mut body, mut sender) = body_channel(&mut payload, PayloadSize::Length(3));

        let read_once = async move {
            let frame = body.frame().await;
            drop(body);
            frame
        };
        let (frame, demanded) = tokio::join!(read_once, async {
            let demanded = sender.wait_demand().await;
            assert!(sender.start().await.is_ok());
            demanded
        });

        assert!(demanded);
        assert_eq!(frame.unwrap().unwrap().into_data().unwrap(), Bytes::from_static(b"abc"));
    }

    #[tokio::test]
    async fn dropped_body_never_demands() {
        let mut payload = stream::iter(vec![chunk(b"abc"), eof()]);
        let (body, mut sender) = body_channel(&mut payload, PayloadSize::Length(3));
        drop(body);

        assert!(!sender.wait_demand().await);
        assert_eq!(sender.remaining(), Some(3));
    }

    #[tokio::test]
    async fn skipping_stops_past_the_budget() {
        let mut payload = stream::iter(vec![chunk(b"abcd"), chunk(b"efgh"), eof()]);
        let (body, mut sender) = body_channel(&mut payload, PayloadSize::Length(8));
        drop(body);

        assert!(!sender.skip_data_within(6).await.unwrap());
        assert!(!sender.is_eof());
        assert_eq!(sender.remaining(), Some(0));
    }

    #[tokio::test]
    async fn unread_body_is_skipped() {
        let mut payload = stream::iter(vec![chunk(b"abc"), chunk(b"def"), eof()]);
        let (body, mut sender) = body_channel(&mut payload, PayloadSize::Length(6));
        drop(body);

        assert!(sender.start().await.is_ok());
        assert!(!sender.is_eof());
        assert!(sender.skip_data_within(64).await.unwrap());
        assert!(sender.is_eof());
        assert!(payload.next().await.is_none());
    }
}
