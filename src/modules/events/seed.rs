use lpt_db::DbError;

use super::models::NewEvent;
use super::store::EventStore;

fn demo_events() -> Vec<NewEvent> {
    vec![
        NewEvent {
            title: "Data & AI Meetup".to_string(),
            short_description: "Monthly community meetup on data and AI.".to_string(),
            detailed_description: "Join fellow data engineers and scientists for lightning talks, \
                live demos, and networking. Snacks and drinks provided."
                .to_string(),
            city: "San Francisco".to_string(),
            days_of_week: vec!["Thursday".to_string()],
            cost_usd: 0.0,
            picture_url: "https://images.pexels.com/photos/1181567/pexels-photo-1181567.jpeg"
                .to_string(),
        },
        NewEvent {
            title: "Weekend Hackathon".to_string(),
            short_description: "48-hour product hackathon.".to_string(),
            detailed_description: "Form a team, ship a prototype, and pitch to a panel of judges. \
                Tracks include AI, analytics, and developer tooling."
                .to_string(),
            city: "New York".to_string(),
            days_of_week: vec!["Saturday".to_string(), "Sunday".to_string()],
            cost_usd: 49.0,
            picture_url: "https://images.pexels.com/photos/1181675/pexels-photo-1181675.jpeg"
                .to_string(),
        },
        NewEvent {
            title: "Analytics Workshop".to_string(),
            short_description: "Hands-on workshop on modern analytics stacks.".to_string(),
            detailed_description: "A full-day workshop covering ingestion, transformation, \
                and visualization best practices using modern tooling."
                .to_string(),
            city: "London".to_string(),
            days_of_week: vec!["Wednesday".to_string()],
            cost_usd: 199.0,
            picture_url: "https://images.pexels.com/photos/1181673/pexels-photo-1181673.jpeg"
                .to_string(),
        },
    ]
}

/// Insert the demo events when the table is empty. Returns how many were added.
pub async fn seed_if_empty(store: &dyn EventStore) -> Result<usize, DbError> {
    if !store.is_empty().await? {
        tracing::debug!("events already present, skipping demo data");
        return Ok(0);
    }

    tracing::info!("seeding demo events");
    let events = demo_events();
    let count = events.len();
    for event in events {
        store.create(event).await?;
    }
    Ok(count)
}
