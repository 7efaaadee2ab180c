use futures::StreamExt;
use reqwest::Client;
use serde_json::json;
use std::io::Write;

/// Talks to a running server: health, transcript, then a streamed chat answer.
///
/// Usage: cargo run -p doc_chat --example client -- [youtube-url] [question]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = Client::new();
    let base_url =
        std::env::var("DOC_CHAT_URL").unwrap_or_else(|_| "http://127.0.0.1:5000".to_string());
    let mut args = std::env::args().skip(1);
    let video_url = args
        .next()
        .unwrap_or_else(|| "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string());
    let question = args
        .next()
        .unwrap_or_else(|| "Summarise this in three sentences.".to_string());

    println!("Health:");
    let health: serde_json::Value = client
        .get(format!("{}/health", base_url))
        .send()
        .await?
        .json()
        .await?;
    println!("{}", serde_json::to_string_pretty(&health)?);

    println!("\nTranscript for {}:", video_url);
    let transcript_response = client
        .post(format!("{}/process_youtube", base_url))
        .json(&json!({ "url": video_url }))
        .send()
        .await?;
    let status = transcript_response.status();
    let transcript: serde_json::Value = transcript_response.json().await?;
    if !status.is_success() {
        anyhow::bail!("transcript request failed ({}): {}", status, transcript["error"]);
    }
    let context = transcript["text"].as_str().unwrap_or_default().to_string();
    println!("{} characters", context.chars().count());

    println!("\nQ: {}\nA: ", question);
    let chat_response = client
        .post(format!("{}/chat", base_url))
        .json(&json!({ "message": question, "context": context }))
        .send()
        .await?;
    if !chat_response.status().is_success() {
        let status = chat_response.status();
        anyhow::bail!("chat failed ({}): {}", status, chat_response.text().await?);
    }

    let mut answer = chat_response.bytes_stream();
    let mut stdout = std::io::stdout();
    while let Some(chunk) = answer.next().await {
        stdout.write_all(&chunk?)?;
        stdout.flush()?;
    }
    println!();

    Ok(())
}
