//! Line-level SDP rewriting used to steer codec, bitrate and FEC negotiation.
//!
//! Every public transformation takes an SDP body and returns a new one. A
//! missing media section, codec or option is never an error: the input comes
//! back unchanged.

pub mod codec;
pub mod fmtp;
pub mod lines;
pub mod media;
pub mod options;
pub mod policy;

pub use codec::{PayloadType, RtpMap};
pub use fmtp::{remove_codec_param, set_codec_param, FmtpRecord};
pub use lines::{ScanDirection, SdpLines, CRLF};
pub use media::{MediaKind, MediaRange};
pub use options::NegotiationOptions;
pub use policy::{
    merge_constraints, munge_local_description, munge_remote_description, prefer_bitrate,
    prefer_codec, remove_video_fec, set_opus_options, set_video_send_initial_bitrate,
    CodecDirection,
};
