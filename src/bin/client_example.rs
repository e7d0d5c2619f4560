//! Example client for the taskrank API

use serde_json::json;
use taskrank::api::{Client, HttpClientImpl};
use taskrank::Strategy;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Create a client with default configuration (localhost:3000)
    // You can customize with ClientConfig if needed
    let client = HttpClientImpl::new();
    println!("taskrank API Client Example");
    println!("---------------------------");

    let today = chrono::Local::now().date_naive();
    let tasks = vec![
        json!({ "id": "report", "title": "Quarterly report", "due_date": (today + chrono::Duration::days(2)).to_string(), "estimated_hours": 6, "importance": 8 }),
        json!({ "id": "email", "title": "Reply to client", "estimated_hours": 0.25, "importance": 6 }),
        json!({ "id": "deploy", "title": "Deploy release", "importance": 7, "dependencies": ["report"] }),
        json!({ "id": "invoice", "title": "Send invoice", "due_date": (today - chrono::Duration::days(1)).to_string(), "estimated_hours": 0.5 }),
    ];

    // Rank everything
    println!("\nAnalyzing {} tasks...", tasks.len());
    let ranked = client.analyze(tasks.clone(), None).await?;
    for scored in &ranked {
        println!("  {:>7.4}  {}", scored.score, scored.task.title);
    }

    // Ask for suggestions under each strategy
    for strategy in [Strategy::Smart, Strategy::Fastest, Strategy::Deadline] {
        println!("\nSuggestions ({})...", strategy);
        for suggestion in client.suggest(tasks.clone(), strategy).await? {
            println!("  {} - {}", suggestion.title, suggestion.reason_summary);
        }
    }

    // A cyclic batch is rejected as a whole
    println!("\nSubmitting a cyclic batch...");
    let cyclic = vec![
        json!({ "id": "a", "title": "A", "dependencies": ["b"] }),
        json!({ "id": "b", "title": "B", "dependencies": ["a"] }),
    ];
    match client.analyze(cyclic, None).await {
        Ok(_) => println!("Unexpectedly accepted"),
        Err(e) => println!("Rejected: {}", e),
    }

    println!("\nAll operations completed successfully!");
    Ok(())
}
