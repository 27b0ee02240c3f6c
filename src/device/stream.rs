// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/edgewatch

//! Display-only MJPEG stream, bypassing the inference client

use futures_util::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::DeviceClient;
use crate::core::EventBus;

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Cuts JPEG frames out of an arbitrary chunked byte stream.
///
/// Multipart boundaries and part headers are skipped implicitly since only
/// the bytes between a start-of-image and end-of-image marker are kept.
pub struct JpegFrameSplitter {
    buf: Vec<u8>,
    max_frame_bytes: usize,
    /// Where the EOI search resumes in a pending frame
    scan_from: usize,
}

impl JpegFrameSplitter {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_frame_bytes,
            scan_from: 0,
        }
    }

    /// Feed a chunk, get back every frame it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();

        loop {
            let Some(start) = find_marker(&self.buf, SOI, 0) else {
                // A trailing 0xFF may be the first half of the next SOI
                let keep = usize::from(self.buf.last() == Some(&0xFF));
                let drop_to = self.buf.len() - keep;
                self.buf.drain(..drop_to);
                self.scan_from = 0;
                break;
            };

            match find_marker(&self.buf, EOI, (start + 2).max(self.scan_from)) {
                Some(end) => {
                    let frame_end = end + 2;
                    frames.push(self.buf[start..frame_end].to_vec());
                    self.buf.drain(..frame_end);
                    self.scan_from = 0;
                }
                None => {
                    if start > 0 {
                        self.buf.drain(..start);
                    }
                    // The pending frame now starts at 0. Its last byte may
                    // be the first half of an EOI.
                    self.scan_from = self.buf.len().saturating_sub(1).max(2);
                    if self.buf.len() > self.max_frame_bytes {
                        warn!("Dropping oversized stream frame ({} bytes)", self.buf.len());
                        self.buf.clear();
                        self.scan_from = 0;
                    }
                    break;
                }
            }
        }

        frames
    }

    pub fn pending_bytes(&self) -> usize {
        self.buf.len()
    }
}

fn find_marker(buf: &[u8], marker: [u8; 2], from: usize) -> Option<usize> {
    if buf.len() < from + 2 {
        return None;
    }
    buf[from..]
        .windows(2)
        .position(|w| w == marker)
        .map(|p| p + from)
}

/// Parameters of the display-only stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParams {
    pub fps: u32,
    pub overlay: bool,
}

/// Display-only stream that restarts whenever its parameters change
pub struct LiveStream {
    client: Arc<DeviceClient>,
    bus: Arc<EventBus>,
    max_frame_bytes: usize,
    params: Mutex<Option<StreamParams>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LiveStream {
    pub fn new(client: Arc<DeviceClient>, bus: Arc<EventBus>, max_frame_bytes: usize) -> Self {
        Self {
            client,
            bus,
            max_frame_bytes,
            params: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    pub fn params(&self) -> Option<StreamParams> {
        *self.params.lock()
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false)
    }

    /// Start the stream, replacing any running one
    pub fn start(&self, params: StreamParams) {
        let mut task = self.task.lock();
        if let Some(old) = task.take() {
            old.abort();
        }
        *self.params.lock() = Some(params);

        info!("Starting live stream at {} fps (overlay: {})", params.fps, params.overlay);
        let client = self.client.clone();
        let bus = self.bus.clone();
        let max_frame_bytes = self.max_frame_bytes;
        *task = Some(tokio::spawn(run_stream(client, bus, params, max_frame_bytes)));
    }

    /// Restart only if something actually changed
    pub fn set_params(&self, params: StreamParams) {
        if self.params() == Some(params) && self.is_running() {
            return;
        }
        if self.is_running() {
            debug!("Stream parameters changed, restarting");
            self.start(params);
        } else {
            *self.params.lock() = Some(params);
        }
    }

    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            info!("Live stream stopped");
        }
    }
}

impl Drop for LiveStream {
    fn drop(&mut self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

async fn run_stream(client: Arc<DeviceClient>, bus: Arc<EventBus>, params: StreamParams, max_frame_bytes: usize) {
    let response = match client.open_stream(params.fps, params.overlay).await {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "Could not open live stream");
            bus.publish_error(&e);
            return;
        }
    };

    let mut splitter = JpegFrameSplitter::new(max_frame_bytes);
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) => {
                for frame in splitter.push(&bytes) {
                    bus.publish_live_frame(frame);
                }
            }
            Err(e) => {
                warn!("Live stream interrupted: {}", e);
                break;
            }
        }
    }

    info!("Live stream ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    fn jpeg(payload: &[u8]) -> Vec<u8> {
        let mut v = SOI.to_vec();
        v.extend_from_slice(payload);
        v.extend_from_slice(&EOI);
        v
    }

    #[test]
    fn test_splits_multipart_body() {
        let mut body = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n".to_vec();
        body.extend(jpeg(&[1, 2, 3]));
        body.extend_from_slice(b"\r\n--frame\r\nContent-Type: image/jpeg\r\n\r\n");
        body.extend(jpeg(&[4, 5]));

        let mut splitter = JpegFrameSplitter::new(1 << 20);
        let frames = splitter.push(&body);
        assert_eq!(frames, vec![jpeg(&[1, 2, 3]), jpeg(&[4, 5])]);
    }

    #[test]
    fn test_frame_across_chunks() {
        let frame = jpeg(&[9, 9, 9, 9]);
        let mut splitter = JpegFrameSplitter::new(1 << 20);

        // split inside the SOI marker and again inside the EOI marker
        assert!(splitter.push(&frame[..1]).is_empty());
        assert!(splitter.push(&frame[1..frame.len() - 1]).is_empty());
        let frames = splitter.push(&frame[frame.len() - 1..]);
        assert_eq!(frames, vec![frame]);
        assert_eq!(splitter.pending_bytes(), 0);
    }

    #[test]
    fn test_oversized_frame_dropped() {
        let mut splitter = JpegFrameSplitter::new(8);
        let mut partial = SOI.to_vec();
        partial.extend_from_slice(&[0u8; 16]);
        assert!(splitter.push(&partial).is_empty());
        assert_eq!(splitter.pending_bytes(), 0);
    }

    #[test]
    fn test_pending_frame_resumes_scan() {
        let mut splitter = JpegFrameSplitter::new(1 << 20);
        assert!(splitter.push(&SOI).is_empty());
        for _ in 0..10 {
            assert!(splitter.push(&[7u8; 100]).is_empty());
            assert_eq!(splitter.scan_from, splitter.pending_bytes() - 1);
        }

        // EOI split across the chunk boundary right at the resume point
        assert!(splitter.push(&[1, 0xFF]).is_empty());
        let frames = splitter.push(&[0xD9]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 2 + 1000 + 1 + 2);
        assert_eq!(splitter.scan_from, 0);
    }

    /// Accepts stream connections forever, reporting each request line and
    /// answering with one JPEG part. Connections are held open.
    async fn stream_server() -> (String, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut open = Vec::new();
            loop {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut head = Vec::new();
                let mut chunk = [0u8; 512];
                while !String::from_utf8_lossy(&head).contains("\r\n\r\n") {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&chunk[..n]);
                }
                let head = String::from_utf8_lossy(&head).to_string();
                tx.send(head.lines().next().unwrap_or_default().to_string()).unwrap();

                let mut response =
                    b"HTTP/1.1 200 OK\r\ncontent-type: multipart/x-mixed-replace; boundary=frame\r\n\r\n--frame\r\n\r\n"
                        .to_vec();
                response.extend(jpeg(&[1, 2, 3]));
                socket.write_all(&response).await.unwrap();
                open.push(socket);
            }
        });

        (format!("http://{}", addr), rx)
    }

    async fn no_new_connection(requests: &mut mpsc::UnboundedReceiver<String>) -> bool {
        tokio::time::sleep(Duration::from_millis(100)).await;
        requests.try_recv().is_err()
    }

    #[tokio::test]
    async fn test_live_stream_restarts_on_change() {
        let (base_url, mut requests) = stream_server().await;
        let client = Arc::new(DeviceClient::new(base_url).unwrap());
        let bus = Arc::new(EventBus::default());
        let mut frames = bus.subscribe_frames();
        let live = LiveStream::new(client, bus, 1 << 20);

        let initial = StreamParams { fps: 5, overlay: true };
        live.start(initial);
        assert_eq!(requests.recv().await.unwrap(), "GET /stream?fps=5&overlay=true HTTP/1.1");
        assert_eq!(&*frames.recv().await.unwrap(), jpeg(&[1, 2, 3]).as_slice());
        assert!(live.is_running());

        // same parameters keep the running connection
        live.set_params(initial);
        assert!(no_new_connection(&mut requests).await);
        assert!(live.is_running());

        let faster = StreamParams { fps: 10, overlay: true };
        live.set_params(faster);
        assert_eq!(requests.recv().await.unwrap(), "GET /stream?fps=10&overlay=true HTTP/1.1");
        assert!(no_new_connection(&mut requests).await);
        assert_eq!(live.params(), Some(faster));
        assert!(live.is_running());

        // stopped: parameters are remembered, nothing connects
        live.stop();
        assert!(!live.is_running());
        let slower = StreamParams { fps: 2, overlay: false };
        live.set_params(slower);
        assert!(no_new_connection(&mut requests).await);
        assert_eq!(live.params(), Some(slower));
        assert!(!live.is_running());
    }
}
