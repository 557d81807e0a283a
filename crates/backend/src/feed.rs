//! RSS feed rendering for a user's episode list.

use rss::extension::itunes::{
    ITunesCategoryBuilder, ITunesChannelExtensionBuilder, ITunesItemExtensionBuilder,
    ITunesOwnerBuilder,
};
use rss::{
    ChannelBuilder, EnclosureBuilder, GuidBuilder, ImageBuilder, ItemBuilder,
};
use shared_types::{PodcastEpisode, User};

const FEED_AUTHOR: &str = "Podbot";
const FEED_AUTHOR_EMAIL: &str = "noreply@podbot.com";

/// Render the complete RSS XML for one user's feed.
///
/// Episodes that have not yet received audio are placeholders from the
/// two-phase write and are excluded from the published feed.
pub fn build_user_feed(user: &User, episodes: &[PodcastEpisode], public_base_url: &str) -> String {
    let base = public_base_url.trim_end_matches('/');
    let local_part = user.email.split('@').next().unwrap_or(&user.email);
    let feed_title = format!("{}'s Daily Podcast", local_part);
    let feed_link = format!("{}/rss/{}", base, user.rss_feed_id);
    let cover_url = format!("{}/static/podcast-cover.jpg", base);

    let items: Vec<rss::Item> = episodes
        .iter()
        .filter(|episode| !episode.audio_url.is_empty())
        .map(|episode| {
            let enclosure = EnclosureBuilder::default()
                .url(episode.audio_url.clone())
                .length(episode.file_size_bytes.to_string())
                .mime_type("audio/mpeg".to_string())
                .build();

            let guid = GuidBuilder::default()
                .value(episode.id.to_string())
                .permalink(false)
                .build();

            let itunes = ITunesItemExtensionBuilder::default()
                .author(Some(FEED_AUTHOR.to_string()))
                .duration(Some(format_duration(episode.duration_seconds)))
                .explicit(Some("clean".to_string()))
                .build();

            ItemBuilder::default()
                .title(Some(episode.title.clone()))
                .description(Some(episode.description.clone()))
                .enclosure(Some(enclosure))
                .guid(Some(guid))
                .pub_date(Some(episode.published_at.to_rfc2822()))
                .itunes_ext(Some(itunes))
                .build()
        })
        .collect();

    let category = ITunesCategoryBuilder::default()
        .text("News".to_string())
        .subcategory(Some(Box::new(
            ITunesCategoryBuilder::default()
                .text("Daily News".to_string())
                .build(),
        )))
        .build();

    let owner = ITunesOwnerBuilder::default()
        .name(Some(FEED_AUTHOR.to_string()))
        .email(Some(FEED_AUTHOR_EMAIL.to_string()))
        .build();

    let itunes_channel = ITunesChannelExtensionBuilder::default()
        .author(Some(FEED_AUTHOR.to_string()))
        .owner(Some(owner))
        .image(Some(cover_url.clone()))
        .explicit(Some("clean".to_string()))
        .categories(vec![category])
        .build();

    let image = ImageBuilder::default()
        .url(cover_url)
        .title(feed_title.clone())
        .link(feed_link.clone())
        .build();

    let channel = ChannelBuilder::default()
        .title(feed_title)
        .link(feed_link)
        .description(format!(
            "Personalized daily briefing podcast for {}",
            user.email
        ))
        .language(Some("en".to_string()))
        .last_build_date(Some(chrono::Utc::now().to_rfc2822()))
        .image(Some(image))
        .itunes_ext(itunes_channel)
        .items(items)
        .build();

    channel.to_string()
}

/// `MM:SS`, or `H:MM:SS` past the hour mark.
fn format_duration(total_seconds: i32) -> String {
    let total_seconds = total_seconds.max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}
