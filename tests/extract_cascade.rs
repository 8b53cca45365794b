// tests/extract_cascade.rs
mod common;

use common::*;
use newswatch::ingest::extract::Extractor;
use newswatch::SiteLayout;

fn extractor() -> Extractor {
    Extractor::new(BASE, SiteLayout::default()).unwrap()
}

#[test]
fn timeline_page_yields_every_entry_in_document_order() {
    let out = extractor().extract_html(TIMELINE, at());
    assert_eq!(out.strategy, Some("timeline"));
    assert_eq!(
        titles(&out.items),
        vec![
            "Légendes Pokémon Z-A : date de sortie annoncée",
            "Journée communautaire de mai",
            "Résultats du tournoi régional de Paris",
            "Nouvelle extension du JCC dévoilée",
            "Distribution d'un Pokémon chromatique",
        ]
    );
    // the contest block above the timeline is never picked up
    assert!(out.items.iter().all(|i| !i.url.contains("concours")));
}

#[test]
fn timeline_fields_are_normalized() {
    let out = extractor().extract_html(TIMELINE, at());
    let first = &out.items[0];
    assert_eq!(
        first.url,
        "https://www.pokekalos.fr/news/legendes-za-date-de-sortie.html"
    );
    assert_eq!(first.id, first.url);
    assert_eq!(first.date, "2 mai 2025");
    assert_eq!(
        first.image_url,
        "https://www.pokekalos.fr/images/news/legendes-za.jpg",
        "deferred image source wins over the placeholder"
    );
    assert!(first.snippet.starts_with("La date de sortie du prochain jeu"));
    assert_eq!(first.scraped_at, at());

    let tournoi = &out.items[2];
    assert_eq!(
        tournoi.url,
        "https://www.pokekalos.fr/news/tournoi-regional-paris.html#resultats"
    );
    assert_eq!(
        tournoi.id,
        "https://www.pokekalos.fr/news/tournoi-regional-paris.html"
    );
    assert_eq!(
        tournoi.image_url,
        "https://cdn.pokekalos.fr/images/news/tournoi.jpg"
    );

    let extension = &out.items[3];
    assert_eq!(
        extension.url,
        "https://www.pokekalos.fr/news/nouvelle-extension-jcc.html"
    );
    assert_eq!(extension.image_url, "");
    // no description element: container text without the title
    assert_eq!(extension.snippet, "28 avril 2025");

    assert_eq!(out.items[4].date, "27 avril 2025");
}

#[test]
fn heading_fallback_finds_the_same_news() {
    let canonical = extractor().extract_html(TIMELINE, at());
    let out = extractor().extract_html(HEADING_FALLBACK, at());
    assert_eq!(out.strategy, Some("heading"));
    assert_eq!(out.items.len(), 4);

    // same ids as the canonical layout, event entry aside
    let expected: Vec<_> = canonical
        .items
        .iter()
        .filter(|i| !i.url.contains("evenements"))
        .cloned()
        .collect();
    assert_eq!(out.items, expected);
}

#[test]
fn section_fallback_uses_section_parents() {
    let out = extractor().extract_html(SECTION_FALLBACK, at());
    assert_eq!(out.strategy, Some("section"));
    assert_eq!(
        titles(&out.items),
        vec![
            "Légendes Pokémon Z-A : date de sortie annoncée",
            "Résultats du tournoi régional de Paris",
        ]
    );
}

#[test]
fn link_cluster_fallback_excludes_contest_blocks() {
    let out = extractor().extract_html(LINK_CLUSTER, at());
    assert_eq!(out.strategy, Some("link_cluster"));
    assert_eq!(
        titles(&out.items),
        vec![
            "Légendes Pokémon Z-A : date de sortie annoncée",
            "Résultats du tournoi régional de Paris",
        ]
    );
    assert_eq!(out.items[0].snippet, "La date de sortie a été dévoilée.");
    assert_eq!(out.items[1].date, "30 avril 2025");
}

#[test]
fn layout_is_configurable() {
    let layout = SiteLayout {
        timeline_id: "feed".into(),
        entry_class: "card".into(),
        ..SiteLayout::default()
    };
    let ex = Extractor::new(BASE, layout).unwrap();
    let html = r#"<div id="feed">
        <div class="card"><h4><a href="/news/a.html">Première nouvelle du jour</a></h4></div>
        <div class="card"><h4><a href="/news/b.html">Deuxième nouvelle du jour</a></h4></div>
    </div>"#;
    let out = ex.extract_html(html, at());
    assert_eq!(out.strategy, Some("timeline"));
    assert_eq!(out.items.len(), 2);
    assert_eq!(out.items[1].url, "https://www.pokekalos.fr/news/b.html");
}

#[test]
fn entries_without_link_are_skipped_silently() {
    let html = r#"<div id="timeline">
        <div class="timeline-news"><p>Bientôt plus d'informations</p></div>
        <div class="timeline-news"><h3><a href="javascript:void(0)">Lien cassé sur la page</a></h3></div>
        <div class="timeline-news"><h3><a href="/news/ok.html">Une vraie actualité</a></h3></div>
    </div>"#;
    let out = extractor().extract_html(html, at());
    assert_eq!(titles(&out.items), vec!["Une vraie actualité"]);
}
