use gigboard::prelude::*;
use std::env;
use tokio::time::{sleep, timeout_at, Duration, Instant};

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    pretty_env_logger::init();

    // Backend URL, anon key and a test account from the environment
    let url = env::var("GIGBOARD_URL").map_err(|_| Error::config("GIGBOARD_URL must be set"))?;
    let key = env::var("GIGBOARD_KEY").map_err(|_| Error::config("GIGBOARD_KEY must be set"))?;
    let email =
        env::var("GIGBOARD_EMAIL").map_err(|_| Error::config("GIGBOARD_EMAIL must be set"))?;
    let password = env::var("GIGBOARD_PASSWORD")
        .map_err(|_| Error::config("GIGBOARD_PASSWORD must be set"))?;

    let gigboard = Gigboard::connect_with_options(&url, &key, ClientOptions::from_env()?)?;

    // This demo assumes `services` and `profiles` tables exposed through
    // the REST API, with `createdAt` defaulting to now()
    let session = gigboard.sign_in(&email, &password).await?;
    println!("Signed in as {}", session.user.id);

    let view = gigboard.live_listings();
    view.activate().await?;
    let mut states = view.watch_state();

    let id = gigboard
        .post_listing(NewListing::new(
            "Demo listing",
            "Posted by the hosted demo",
            "Writing",
        ))
        .await?;
    println!("Posted {}", id);

    // Polling picks the new row up within one interval
    let interval = gigboard.options().poll_interval;
    let deadline = Instant::now() + interval * 3;
    while view.get(&id).is_none() && Instant::now() < deadline {
        let _ = timeout_at(deadline, states.changed()).await;
    }
    if view.get(&id).is_none() {
        println!("Listing not visible yet");
    }
    for listing in view.snapshot().iter().take(10) {
        println!("  {} ({}) by {}", listing.title, listing.category, listing.owner_display_name());
    }
    let counts = view.counts();
    println!("{} listings, {} uncategorized", counts.total, counts.uncategorized);

    gigboard.remove_listing(&id).await?;
    println!("Removed {}", id);
    sleep(Duration::from_millis(100)).await;

    view.deactivate();
    gigboard.sign_out().await?;
    Ok(())
}
