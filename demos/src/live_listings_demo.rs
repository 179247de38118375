use gigboard::auth::IdentityHub;
use gigboard::prelude::*;
use gigboard::store::MemoryStore;
use log::info;
use std::sync::Arc;

fn print_board(view: &LiveListingView, viewer: Option<&Actor>) {
    let summary = view.summary();
    println!(
        "-- {} services by {} freelancers (filter: {}) --",
        summary.total,
        summary.contributors,
        view.filter()
    );
    for listing in view.visible() {
        let action = match listing.action_for(viewer) {
            ListingAction::Remove => "[remove]".to_string(),
            ListingAction::Connect { mailto: Some(link) } => format!("[connect: {}]", link),
            ListingAction::Connect { mailto: None } => "[connect]".to_string(),
        };
        let when = listing
            .created_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "just now".to_string());
        println!(
            "  {} ({}) by {} at {} {}",
            listing.title,
            listing.category,
            listing.owner_display_name(),
            when,
            action
        );
    }
    for (category, count) in summary.categories.iter() {
        if count > 0 {
            println!("  {}: {}", category, count);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    pretty_env_logger::init();

    let options = ClientOptions::from_env()?;
    let store = Arc::new(MemoryStore::new());
    let hub = IdentityHub::new();
    let gigboard = Gigboard::with_backends(store.clone(), Arc::new(hub.clone()), options);

    let (view, _binding) = gigboard.session_listings();
    let mut states = view.watch_state();

    let ana = Actor::new("ana")
        .with_display_name("Ana")
        .with_email("ana@example.com");
    hub.sign_in(ana.clone());
    // the binding subscribes in the background
    let _ = states
        .wait_for(|s| matches!(s, ViewState::Ready { .. }))
        .await;
    info!("Signed in as {}", ana.greeting_name());

    gigboard
        .post_listing(NewListing::new(
            "Landing page in a week",
            "Responsive, accessible, fast.",
            "Web Development",
        ))
        .await?;
    let blog = gigboard
        .post_listing(NewListing::new("Blog posts", "Long-form articles.", "Writing"))
        .await?;
    gigboard.ensure_profile().await?;
    print_board(&view, Some(&ana));

    let ben = Actor::new("ben").with_display_name("Ben");
    hub.sign_in(ben.clone());
    gigboard
        .post_listing(NewListing::new("SEO audit", "", "Marketing"))
        .await?;
    gigboard.ensure_profile().await?;
    if let Err(e) = gigboard.remove_listing(&blog).await {
        println!("Ben cannot remove Ana's listing: {}", e);
    }
    gigboard.submit_rating("ana", 5, "Quick and clear").await?;

    view.set_filter(CategoryFilter::only("Writing"));
    print_board(&view, Some(&ben));
    view.set_filter(CategoryFilter::All);
    print_board(&view, None);

    hub.sign_out();
    let _ = states.wait_for(|s| *s == ViewState::Idle).await;
    println!("Signed out; cached listings: {}", view.snapshot().len());

    Ok(())
}
