use std::path::Path;

use crate::shared::encoding_profile::EncodingProfile;
use crate::shared::frame::Frame;

/// Streaming video encoder + muxer.
///
/// Packets produced by the encoder are muxed as soon as they come out, so
/// the output grows while frames are still being produced. Shutdown is two
/// steps: [`flush`](VideoWriter::flush) drains frames the encoder held back
/// for lookahead/reordering, then [`close`](VideoWriter::close) finalizes the
/// container. Closing without flushing truncates the output.
pub trait VideoWriter: Send {
    /// Creates the output container and a single video stream of the given size.
    fn open(
        &mut self,
        path: &Path,
        width: u32,
        height: u32,
        profile: &EncodingProfile,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Encodes one RGB frame and muxes any packets the encoder returns.
    /// Returns the number of packets written.
    fn encode(&mut self, frame: &Frame) -> Result<usize, Box<dyn std::error::Error>>;

    /// Signals end of input and muxes every packet still buffered in the encoder.
    fn flush(&mut self) -> Result<usize, Box<dyn std::error::Error>>;

    /// Writes the container trailer and releases the output.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
