use marquee_api::{Movie, MovieDetails};
use marquee_core::{FetchState, PageState};

use super::persistence::TrendingMovie;

pub fn render_browse(state: &PageState<Movie>) -> Vec<String> {
    let mut lines = Vec::new();
    if state.loading() {
        lines.push("Loading latest movies...".to_string());
        return lines;
    }
    if let Some(err) = state.error() {
        lines.push(format!("Error: {err}"));
    }
    if state.data().is_empty() {
        if state.error().is_none() {
            lines.push("No movies found".to_string());
        }
        return lines;
    }

    lines.push(format!(
        "Latest Movies ({} loaded, page {})",
        state.data().len(),
        state.page()
    ));
    lines.extend(state.data().iter().map(movie_line));
    if state.loading_more() {
        lines.push("  loading more...".to_string());
    } else if !state.has_more() {
        lines.push("  end of list".to_string());
    }
    lines
}

pub fn render_search(query: &str, state: &FetchState<Movie>) -> Vec<String> {
    if state.loading() {
        return vec!["Searching...".to_string()];
    }
    if let Some(err) = state.error() {
        return vec![format!("Error: {err}")];
    }

    let query = query.trim();
    match state.data() {
        Some(movies) if !movies.is_empty() && !query.is_empty() => {
            let mut lines = vec![format!("Search Results for {query}")];
            lines.extend(movies.iter().map(movie_line));
            lines
        }
        _ if query.is_empty() => vec!["Search for a movie".to_string()],
        _ => vec!["No movies found".to_string()],
    }
}

pub fn render_trending(state: &FetchState<TrendingMovie>) -> Vec<String> {
    if state.loading() {
        return vec!["Loading trending searches...".to_string()];
    }
    if let Some(err) = state.error() {
        return vec![format!("Error: {err}")];
    }
    let entries = state.data().unwrap_or_default();
    if entries.is_empty() {
        return vec!["No trending searches yet".to_string()];
    }

    let mut lines = vec!["Trending Movies".to_string()];
    lines.extend(entries.iter().enumerate().map(|(index, entry)| {
        format!(
            "  {}. {} ({} searches for \"{}\")",
            index + 1,
            entry.title,
            entry.count,
            entry.search_term
        )
    }));
    lines
}

pub fn render_details(details: &MovieDetails) -> Vec<String> {
    let mut lines = vec![match details.release_date.as_deref() {
        Some(date) if !date.is_empty() => format!("{} ({date})", details.title),
        _ => details.title.clone(),
    }];
    if let Some(tagline) = details.tagline.as_deref().filter(|t| !t.is_empty()) {
        lines.push(format!("  \"{tagline}\""));
    }

    let mut facts = Vec::new();
    if let Some(runtime) = details.runtime {
        facts.push(format!("{runtime}m"));
    }
    facts.push(format!("rating {:.1}/10 ({} votes)", details.vote_average, details.vote_count));
    if !details.status.is_empty() {
        facts.push(details.status.clone());
    }
    lines.push(format!("  {}", facts.join(" | ")));

    if !details.genres.is_empty() {
        let genres: Vec<_> = details.genres.iter().map(|g| g.name.as_str()).collect();
        lines.push(format!("  Genres: {}", genres.join(", ")));
    }
    if details.budget > 0 || details.revenue > 0 {
        lines.push(format!(
            "  Budget: ${} million | Revenue: ${} million",
            details.budget / 1_000_000,
            details.revenue / 1_000_000
        ));
    }
    if !details.production_companies.is_empty() {
        let names: Vec<_> = details
            .production_companies
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        lines.push(format!("  Production: {}", names.join(" - ")));
    }
    if let Some(overview) = details.overview.as_deref().filter(|o| !o.is_empty()) {
        lines.push(format!("  {overview}"));
    }
    lines
}

fn movie_line(movie: &Movie) -> String {
    let year = movie.release_year().unwrap_or("----");
    format!(
        "  [{}] {} ({year}) {:.1}/10",
        movie.id, movie.title, movie.vote_average
    )
}
