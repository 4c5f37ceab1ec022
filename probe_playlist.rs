// Fetch a master playlist from go2rtc and show what the gateway would serve.
//
// Usage: probe_playlist <stream_key> [upstream host:port] [public base URL]
use cctv_stream_gateway::config::UpstreamConfig;
use cctv_stream_gateway::translator::PlaylistRewriter;
use cctv_stream_gateway::upstream::{Go2rtcClient, MediaGateway, PlaylistPath};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut args = std::env::args().skip(1);
    let stream_key = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: probe_playlist <stream_key> [upstream] [public_base_url]"))?;
    let upstream = args.next().unwrap_or_else(|| "localhost:1984".to_string());
    let public_base = args.next().unwrap_or_else(|| "http://localhost:3000".to_string());

    let client = Go2rtcClient::new(&UpstreamConfig {
        address: upstream,
        connect_timeout_secs: 5,
        request_timeout_secs: 10,
    })?;

    println!("\n=== Fetching master playlist for {} from {} ===", stream_key, client.base_url());

    match client.fetch_playlist(&stream_key, &PlaylistPath::Master).await {
        Ok(playlist) => {
            println!("Status: {}", playlist.status);
            println!("Content-Type: {}", playlist.content_type.as_deref().unwrap_or("<none>"));

            let raw = String::from_utf8_lossy(&playlist.body).into_owned();
            println!("\n--- RAW PLAYLIST FROM MEDIA SERVER ---");
            println!("{}", raw);

            let rewritten = PlaylistRewriter::rewrite(&raw, &public_base, &stream_key);
            println!("\n--- PLAYLIST AS SERVED BY THE GATEWAY ---");
            println!("{}", rewritten);

            if raw == rewritten {
                println!("\n⚠ No variant reference found, playlist passed through unchanged");
            } else {
                println!("\n✓ Variant reference rewritten to {}", PlaylistRewriter::variant_url(&public_base, &stream_key));
            }
        }
        Err(e) => {
            eprintln!("Playlist fetch failed (clients would see 502): {}", e);
        }
    }

    Ok(())
}
