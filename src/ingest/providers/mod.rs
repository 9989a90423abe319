// src/ingest/providers/mod.rs
pub mod json_videos;
pub mod xml_articles;

pub use json_videos::JsonVideoProvider;
pub use xml_articles::XmlArticleProvider;
