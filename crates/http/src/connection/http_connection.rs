use std::error::Error;
use std::fmt::Display;
use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use http::header::{CONNECTION, EXPECT};
use http::{HeaderValue, Response, StatusCode, Version};
use http_body::Body;
use http_body_util::{BodyExt, Empty};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::select;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, warn};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::handler::Handler;
use crate::protocol::body::body_channel;
use crate::protocol::{HttpError, Message, ParseError, PayloadItem, PayloadSize, RequestHeader, ResponseHead, SendError};

/// The most unread body bytes skipped to keep a connection alive; past this it is closed.
const MAX_DRAIN_SIZE: u64 = 64 * 1024;

/// An HTTP/1.1 connection serving requests one at a time.
///
/// # Type Parameters
///
/// * `R`: the async readable half of the stream
/// * `W`: the async writable half of the stream
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
}

/// What became of a single request on the connection.
enum Outcome {
    /// A response was written and the connection may serve the next request.
    KeepAlive,
    /// A response was written and the client asked to close.
    Close,
    /// The peer went away in the middle of the body; nothing was written.
    Aborted,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), 8 * 1024),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
        }
    }

    /// Serves requests until the peer closes, asks to close, or sends something unparsable.
    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler,
        H::RespBody: Body<Data = Bytes> + Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        loop {
            match self.framed_read.next().await {
                Some(Ok(Message::Header((header, payload_size)))) => match self.do_process(header, payload_size, &handler).await? {
                    Outcome::KeepAlive => continue,
                    Outcome::Close => {
                        debug!("client asked to close the connection");
                        return Ok(());
                    }
                    Outcome::Aborted => return Ok(()),
                },

                Some(Ok(Message::Payload(_))) => {
                    error!("received body data while expecting a request header");
                    Self::do_send_response(&mut self.framed_write, build_error_response(StatusCode::BAD_REQUEST)).await?;
                    return Err(ParseError::invalid_body("need header while receive body").into());
                }

                Some(Err(e)) => {
                    error!(cause = %e, "can't receive next request");
                    Self::do_send_response(&mut self.framed_write, build_error_response(StatusCode::BAD_REQUEST)).await?;
                    return Err(e.into());
                }

                None => {
                    info!("can't read more request, break this connection down");
                    return Ok(());
                }
            }
        }
    }

    async fn do_process<H>(&mut self, header: RequestHeader, payload_size: PayloadSize, handler: &Arc<H>) -> Result<Outcome, HttpError>
    where
        H: Handler,
        H::RespBody: Body<Data = Bytes> + Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        let keep_alive = header.is_keep_alive();
        let awaiting_continue = !payload_size.is_empty() && expects_continue(&header);
        let mut continued = false;

        let (req_body, mut body_sender) = body_channel(&mut self.framed_read, payload_size);
        let request = header.body(req_body);

        // the handler may wait on body chunks while the sender waits on chunk requests,
        // so both are driven together until the handler finishes
        let (response_result, body_result) = {
            let writer = &mut self.framed_write;
            let handler_future = handler.call(request);
            let body_future = async {
                // 100 Continue goes out only once the handler asks for the body
                if awaiting_continue {
                    if !body_sender.wait_demand().await {
                        return std::future::pending().await;
                    }
                    write_continue(writer.get_mut()).await?;
                    continued = true;
                }
                body_sender.start().await
            };
            tokio::pin!(handler_future);
            tokio::pin!(body_future);

            let mut body_result = None;
            let response_result = loop {
                select! {
                    biased;
                    response = &mut handler_future => break response,
                    result = &mut body_future, if body_result.is_none() => body_result = Some(result),
                }
            };

            (response_result, body_result)
        };

        match body_result {
            Some(Err(e)) if e.is_connection_aborted() => {
                warn!(cause = %e, "request body aborted by peer, discard the request");
                return Ok(Outcome::Aborted);
            }
            Some(Err(e)) => {
                error!(cause = %e, "failed to read request body");
                Self::do_send_response(&mut self.framed_write, build_error_response(StatusCode::BAD_REQUEST)).await?;
                return Err(e.into());
            }
            Some(Ok(())) | None if body_sender.is_eof() => {}
            Some(Ok(())) | None => {
                // the handler answered without reading the whole body
                let drainable = (!awaiting_continue || continued)
                    && body_sender.remaining().is_none_or(|remaining| remaining <= MAX_DRAIN_SIZE);
                if !drainable {
                    info!(remaining = ?body_sender.remaining(), "request body left unread, close after response");
                    Self::send_response(&mut self.framed_write, response_result, true).await?;
                    return Ok(Outcome::Close);
                }

                Self::send_response(&mut self.framed_write, response_result, !keep_alive).await?;
                return match body_sender.skip_data_within(MAX_DRAIN_SIZE).await {
                    Ok(true) if keep_alive => Ok(Outcome::KeepAlive),
                    Ok(_) => Ok(Outcome::Close),
                    Err(e) if e.is_connection_aborted() => Ok(Outcome::Aborted),
                    Err(e) => Err(e.into()),
                };
            }
        }

        Self::send_response(&mut self.framed_write, response_result, !keep_alive).await?;

        Ok(if keep_alive { Outcome::KeepAlive } else { Outcome::Close })
    }

    async fn send_response<T, E>(
        framed_write: &mut FramedWrite<W, ResponseEncoder>,
        response_result: Result<Response<T>, E>,
        close: bool,
    ) -> Result<(), HttpError>
    where
        T: Body<Data = Bytes> + Unpin,
        T::Error: Display,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        match response_result {
            Ok(mut response) => {
                if close {
                    response.headers_mut().insert(CONNECTION, HeaderValue::from_static("close"));
                }
                Self::do_send_response(framed_write, response).await
            }
            Err(e) => {
                let e: Box<dyn Error + Send + Sync> = e.into();
                error!(cause = %e, "handle response error");
                let mut response = build_error_response(StatusCode::INTERNAL_SERVER_ERROR);
                if close {
                    response.headers_mut().insert(CONNECTION, HeaderValue::from_static("close"));
                }
                Self::do_send_response(framed_write, response).await
            }
        }
    }

    async fn do_send_response<T>(framed_write: &mut FramedWrite<W, ResponseEncoder>, response: Response<T>) -> Result<(), HttpError>
    where
        T: Body<Data = Bytes> + Unpin,
        T::Error: Display,
    {
        let (header_parts, mut body) = response.into_parts();
        let payload_size = PayloadSize::from(body.size_hint());

        let header = Message::<_, Bytes>::Header((ResponseHead::from_parts(header_parts, ()), payload_size));
        framed_write.feed(header).await?;

        loop {
            match body.frame().await {
                Some(Ok(frame)) => {
                    // trailers are not written
                    let Ok(data) = frame.into_data() else {
                        continue;
                    };

                    framed_write.feed(Message::Payload(PayloadItem::Chunk(data))).await?;
                }
                Some(Err(e)) => return Err(SendError::invalid_body(format!("resolve response body error: {e}")).into()),
                None => {
                    // send flushes the head and every buffered chunk
                    framed_write.send(Message::Payload(PayloadItem::<Bytes>::Eof)).await?;
                    return Ok(());
                }
            }
        }
    }
}

async fn write_continue<W: AsyncWrite + Unpin>(writer: &mut W) -> Result<(), ParseError> {
    writer.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await.map_err(ParseError::io)?;
    writer.flush().await.map_err(ParseError::io)?;
    info!("handler asked for the body, sent continue response");
    Ok(())
}

fn expects_continue(header: &RequestHeader) -> bool {
    header.version() == Version::HTTP_11
        && header.headers().get(EXPECT).is_some_and(|value| value.as_bytes().eq_ignore_ascii_case(b"100-continue"))
}

fn build_error_response(status_code: StatusCode) -> Response<Empty<Bytes>> {
    let mut response = Response::new(Empty::<Bytes>::new());
    *response.status_mut() = status_code;
    response
}
