//! Built-in catalog: the subset of the MusicBrainz schema the default
//! entities index.
//!
//! Foreign key attributes carry an `_id` suffix; the database columns do
//! not (`artist.area_id` is stored in `artist.area`).

use super::catalog::Catalog;
use super::errors::SchemaResult;
use super::types::TableDef;

/// Name of the database schema the tables live in
pub const DATABASE_SCHEMA: &str = "musicbrainz";

/// Lookup tables share one layout.
fn type_table(name: &str) -> TableDef {
    TableDef::new(name)
        .with_columns(["id", "gid", "name", "child_order", "description"])
        .with_mapped_column("parent_id", "parent")
}

/// All built-in table definitions
pub fn tables() -> Vec<TableDef> {
    vec![
        TableDef::new("area")
            .with_columns([
                "id",
                "gid",
                "name",
                "edits_pending",
                "last_updated",
                "begin_date_year",
                "end_date_year",
                "ended",
                "comment",
            ])
            .with_mapped_column("type_id", "type")
            .many_to_one("type", "area_type", "type_id")
            .one_to_many("aliases", "area_alias", "area_id"),
        type_table("area_type"),
        TableDef::new("area_alias")
            .with_columns([
                "id",
                "name",
                "locale",
                "edits_pending",
                "last_updated",
                "sort_name",
                "begin_date_year",
                "end_date_year",
                "primary_for_locale",
                "ended",
            ])
            .with_mapped_column("area_id", "area")
            .with_mapped_column("type_id", "type")
            .many_to_one("area", "area", "area_id")
            .many_to_one("type", "area_alias_type", "type_id"),
        type_table("area_alias_type"),
        TableDef::new("artist")
            .with_columns([
                "id",
                "gid",
                "name",
                "sort_name",
                "begin_date_year",
                "end_date_year",
                "comment",
                "edits_pending",
                "last_updated",
                "ended",
            ])
            .with_mapped_column("type_id", "type")
            .with_mapped_column("area_id", "area")
            .with_mapped_column("gender_id", "gender")
            .with_mapped_column("begin_area_id", "begin_area")
            .with_mapped_column("end_area_id", "end_area")
            .many_to_one("type", "artist_type", "type_id")
            .many_to_one("area", "area", "area_id")
            .many_to_one("begin_area", "area", "begin_area_id")
            .many_to_one("end_area", "area", "end_area_id")
            .many_to_one("gender", "gender", "gender_id")
            .one_to_many("aliases", "artist_alias", "artist_id")
            .many_to_many("tags", "tag", "artist_tag", "artist_id", "tag_id"),
        type_table("artist_type"),
        type_table("gender"),
        TableDef::new("artist_alias")
            .with_columns([
                "id",
                "name",
                "locale",
                "sort_name",
                "primary_for_locale",
                "begin_date_year",
                "end_date_year",
                "ended",
                "edits_pending",
            ])
            .with_mapped_column("artist_id", "artist")
            .with_mapped_column("type_id", "type")
            .many_to_one("artist", "artist", "artist_id"),
        TableDef::new("label")
            .with_columns([
                "id",
                "gid",
                "name",
                "begin_date_year",
                "end_date_year",
                "label_code",
                "comment",
                "ended",
                "last_updated",
            ])
            .with_mapped_column("type_id", "type")
            .with_mapped_column("area_id", "area")
            .many_to_one("type", "label_type", "type_id")
            .many_to_one("area", "area", "area_id"),
        type_table("label_type"),
        TableDef::new("place")
            .with_columns([
                "id",
                "gid",
                "name",
                "address",
                "coordinates",
                "comment",
                "begin_date_year",
                "end_date_year",
                "ended",
            ])
            .with_mapped_column("type_id", "type")
            .with_mapped_column("area_id", "area")
            .many_to_one("type", "place_type", "type_id")
            .many_to_one("area", "area", "area_id"),
        type_table("place_type"),
        TableDef::new("tag").with_columns(["id", "name", "ref_count"]),
        TableDef::new("artist_tag")
            .with_primary_key(["artist_id", "tag_id"])
            .with_columns(["count", "last_updated"])
            .with_mapped_column("artist_id", "artist")
            .with_mapped_column("tag_id", "tag"),
    ]
}

/// Builds the validated built-in catalog
pub fn catalog() -> SchemaResult<Catalog> {
    Catalog::new(tables())
}
