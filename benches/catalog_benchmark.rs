//! Catalog building and listing page parsing benchmarks
//!
//! The sets table holds roughly 20k rows and a listing page a few dozen
//! product cards; both run once per refresh or per page.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use brick_enricher::domain::{CatalogIndex, SetRow, ThemeRow, derive_catalog_id};
use brick_enricher::infrastructure::{MarkupPageParser, PageParser, parse_table};

fn synthetic_sets_csv(rows: usize) -> String {
    let mut csv = String::from("set_num,name,year,theme_id,num_parts,img_url\n");
    for i in 0..rows {
        csv.push_str(&format!(
            "{i}-1,\"Set {i}, deluxe\",{},{},{},https://cdn.test/{i}.jpg\n",
            1970 + i % 55,
            i % 700,
            i % 5000
        ));
    }
    csv
}

fn synthetic_themes(count: usize) -> Vec<ThemeRow> {
    (0..count)
        .map(|i| ThemeRow {
            id: i.to_string(),
            name: format!("Theme {i}"),
        })
        .collect()
}

fn synthetic_listing_page(cards: usize) -> String {
    let mut html = String::from("<html><body><div class=\"grid\">");
    for i in 0..cards {
        html.push_str(&format!(
            "<div class=\"card\"><a href=\"/products/m{i}0301-kit\"><img src=\"x.jpg\"></a>\
             <a href=\"/products/m{i}0301-kit\"><span class=\"title\">Kit</span> M{i}0301</a></div>"
        ));
    }
    html.push_str("</div></body></html>");
    html
}

fn bench_catalog_build(c: &mut Criterion) {
    let csv = synthetic_sets_csv(20_000);
    let sets: Vec<SetRow> = parse_table(&csv).unwrap();
    let themes = synthetic_themes(700);

    c.bench_function("parse_sets_table_20k", |b| {
        b.iter(|| {
            let rows: Vec<SetRow> = parse_table(black_box(&csv)).unwrap();
            black_box(rows)
        })
    });

    c.bench_function("build_catalog_index_20k", |b| {
        b.iter(|| black_box(CatalogIndex::build(black_box(&sets), black_box(&themes))))
    });

    let catalog = CatalogIndex::build(&sets, &themes);
    c.bench_function("catalog_lookup_by_store_key", |b| {
        b.iter(|| black_box(catalog.lookup(&derive_catalog_id(black_box("M54321")))))
    });
}

fn bench_listing_parse(c: &mut Criterion) {
    let parser = MarkupPageParser::new("https://shop.test");
    let page = synthetic_listing_page(48);

    c.bench_function("parse_listing_page_48_cards", |b| {
        b.iter(|| black_box(parser.parse(black_box(&page))))
    });
}

criterion_group!(benches, bench_catalog_build, bench_listing_parse);
criterion_main!(benches);
