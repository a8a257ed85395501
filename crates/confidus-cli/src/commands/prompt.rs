use chrono::NaiveDate;
use confidus_core::{Clock, Config, SystemClock};

pub fn run(date: Option<NaiveDate>, all: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let deck = config.prompt_deck()?;

    if all {
        for (i, prompt) in deck.all().iter().enumerate() {
            println!("{i:>2}  {prompt}");
        }
        return Ok(());
    }

    let date = date.unwrap_or_else(|| SystemClock.today());
    println!("{}", deck.for_date(date));
    Ok(())
}
