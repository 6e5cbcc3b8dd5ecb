//! Async I/O traits and utilities.
//!
//! Re-exports Tokio's I/O traits so streamed downloads can be expressed without
//! a direct Tokio dependency.
//!
//! # Examples
//!
//! ```rust
//! use core_async::io::{AsyncRead, AsyncReadExt};
//!
//! async fn read_all<R: AsyncRead + Unpin>(mut reader: R) -> std::io::Result<Vec<u8>> {
//!     let mut buffer = Vec::new();
//!     reader.read_to_end(&mut buffer).await?;
//!     Ok(buffer)
//! }
//! ```

pub use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt,
    BufReader, BufWriter, ReadBuf,
};
