use confidus_core::Config;

use super::open_tracker;

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let tracker = open_tracker(&config)?;
    let status = tracker.status();

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    if status.completed_today {
        println!("Today's visualisation done");
    } else {
        println!("Daily visualisation not done yet");
    }
    if status.overdue {
        println!("Overdue: more than 24 hours since the last one");
    }
    match status.last.and_then(|r| r.completed_at()) {
        Some(at) => println!("Last completed: {}", at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")),
        None => match status.last {
            Some(record) => println!("Last completed: {}", record.date),
            None => println!("Never completed"),
        },
    }
    Ok(())
}

pub fn complete() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let tracker = open_tracker(&config)?;
    let record = tracker.mark_completed()?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
