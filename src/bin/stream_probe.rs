//! stream_probe - resolve a Kinesis Video stream to its HLS playback URL
//!
//! Debug aid for stream configuration: runs the same two-call resolution
//! the daemon uses (GetDataEndpoint, then GetHLSStreamingSessionURL) and
//! prints the result. Credentials come from the ambient AWS environment.

use anyhow::Result;
use clap::Parser;

use linger_watch::{KinesisVideoClient, PlaybackMode};

#[derive(Parser, Debug)]
#[command(name = "stream_probe", about = "Resolve a stream's HLS playback URL")]
struct Args {
    /// Kinesis Video stream name
    stream: String,

    /// AWS region
    #[arg(long, env = "LINGER_REGION", default_value = "us-east-1")]
    region: String,

    /// Playback mode: LIVE, LIVE_REPLAY, or ON_DEMAND
    #[arg(long, default_value = "LIVE")]
    playback_mode: PlaybackMode,

    /// Only resolve the data endpoint, skip the session URL
    #[arg(long)]
    endpoint_only: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let client = KinesisVideoClient::from_env(&args.region)?;

    let endpoint = client.get_data_endpoint(&args.stream)?;
    if args.endpoint_only {
        println!("{}", endpoint);
        return Ok(());
    }

    let url = client.get_hls_streaming_session_url(&endpoint, &args.stream, args.playback_mode)?;
    println!("{}", url);
    Ok(())
}
