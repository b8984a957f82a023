//! Read image frames on a tokio runtime with the async codec.
//!
//! Run with:
//!   cargo run -p camwire --example async-stream --features async -- 127.0.0.1:7891

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;

use camwire::frame::ImageFrameCodec;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:7891".to_string());

    let socket = TcpStream::connect(&addr).await?;
    eprintln!("Connected to {addr}");

    let mut frames = FramedRead::new(socket, ImageFrameCodec::default()).take(10);
    while let Some(frame) = frames.next().await {
        let frame = frame?;
        eprintln!("frame {}x{} ({} bytes)", frame.width, frame.height, frame.payload.len());
    }
    Ok(())
}
