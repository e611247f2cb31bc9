//! Protobuf messages describing the result of a frame extraction run.
//!
//! The messages are declared with `prost` derives rather than generated from
//! a `.proto` file, so the crate builds without `protoc` on the host.

pub mod proto {
    /// One frame written to disk during an extraction run.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ExtractedFrame {
        /// 0-based selection sequence number.
        #[prost(uint64, tag = "1")]
        pub sequence: u64,
        /// 0-based index of the frame in the source video.
        #[prost(uint64, tag = "2")]
        pub frame_index: u64,
        #[prost(double, tag = "3")]
        pub timestamp_seconds: f64,
        /// Path the frame image was written to.
        #[prost(string, tag = "4")]
        pub path: ::prost::alloc::string::String,
    }

    /// Summary of a single extraction run over one video file.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ExtractionSummary {
        #[prost(string, tag = "1")]
        pub video_path: ::prost::alloc::string::String,
        #[prost(string, tag = "2")]
        pub output_dir: ::prost::alloc::string::String,
        /// Nominal capture rate reported by the container.
        #[prost(double, tag = "3")]
        pub fps: f64,
        /// `total_frames / fps`, or 0 when the frame count is unknown.
        #[prost(double, tag = "4")]
        pub duration_seconds: f64,
        /// Frame count reported by the container (0 if unknown).
        #[prost(uint64, tag = "5")]
        pub total_frames: u64,
        /// Frames actually pulled from the decoder.
        #[prost(uint64, tag = "6")]
        pub frames_decoded: u64,
        #[prost(uint64, tag = "7")]
        pub frames_extracted: u64,
        #[prost(double, tag = "8")]
        pub frames_per_minute: f64,
        #[prost(uint64, tag = "9")]
        pub frame_interval: u64,
        #[prost(message, repeated, tag = "10")]
        pub frames: ::prost::alloc::vec::Vec<ExtractedFrame>,
    }
}
