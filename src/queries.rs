//! Statement text for the warehouse schema and the full-refresh load.
//!
//! The warehouse is a small star schema: two untyped staging tables fed by
//! bulk loads from object storage, one fact table (`songplay`) and four
//! dimension tables derived from staging by distinct projection. Everything
//! here is plain declarative SQL; a [`QuerySet`] assembles the four ordered
//! statement lists once, from the loaded configuration, and is immutable
//! afterwards.
//!
//! Two oddities are preserved on purpose:
//!
//! - `dim_time.weekday` answers "is this a weekday" with `'Y'`, so
//!   day-of-week 6 and 7 map to `'N'`. The polarity reads backwards from
//!   the column name; downstream reports depend on it as-is.
//! - The `songplay` insert joins events to songs on title equality alone
//!   (case-sensitive, no trimming, no artist filter). Shared titles fan out
//!   to one fact row per matching song; events with no matching title are
//!   dropped silently.

use crate::config::Config;

/// The seven warehouse tables, in drop/create order (staging first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    StageEvents,
    StageSongs,
    Songplay,
    DimUser,
    DimSong,
    DimArtist,
    DimTime,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::StageEvents,
        Table::StageSongs,
        Table::Songplay,
        Table::DimUser,
        Table::DimSong,
        Table::DimArtist,
        Table::DimTime,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::StageEvents => "stage_events",
            Table::StageSongs => "stage_songs",
            Table::Songplay => "songplay",
            Table::DimUser => "dim_user",
            Table::DimSong => "dim_song",
            Table::DimArtist => "dim_artist",
            Table::DimTime => "dim_time",
        }
    }

    /// Drop tolerates the table not existing; a fresh warehouse is not an error.
    fn drop_sql(self) -> String {
        format!("DROP TABLE IF EXISTS {};", self.name())
    }

    /// Create deliberately has no IF NOT EXISTS: running the create phase
    /// against a warehouse that still has tables must fail loudly instead
    /// of silently keeping a stale shape.
    fn create_sql(self) -> &'static str {
        match self {
            Table::StageEvents => CREATE_STAGE_EVENTS,
            Table::StageSongs => CREATE_STAGE_SONGS,
            Table::Songplay => CREATE_SONGPLAY,
            Table::DimUser => CREATE_DIM_USER,
            Table::DimSong => CREATE_DIM_SONG,
            Table::DimArtist => CREATE_DIM_ARTIST,
            Table::DimTime => CREATE_DIM_TIME,
        }
    }
}

// ============ Create statements ============
//
// Staging columns are all varchar so loosely-structured source JSON always
// lands; typed casts happen in the transform inserts.

const CREATE_STAGE_EVENTS: &str = "\
CREATE TABLE stage_events
(
  artist          varchar(1000),
  auth            varchar(100),
  firstName       varchar(500),
  gender          varchar(10),
  itemInSession   varchar(100),
  lastName        varchar(500),
  length          varchar(50),
  level           varchar(100),
  location        varchar(1000),
  method          varchar(100),
  page            varchar(100),
  registration    varchar(100),
  sessionId       varchar(100),
  song            varchar(500),
  status          varchar(50),
  ts              varchar(50),
  userAgent       varchar(100),
  userId          varchar(100)
);";

const CREATE_STAGE_SONGS: &str = "\
CREATE TABLE stage_songs
(
  artist_id         varchar(100),
  artist_latitude   varchar(50),
  artist_location   varchar(1000),
  artist_longitude  varchar(50),
  artist_name       varchar(1000),
  duration          varchar(50),
  num_songs         varchar(50),
  song_id           varchar(50),
  title             varchar(1000),
  year              varchar(10)
);";

const CREATE_SONGPLAY: &str = "\
CREATE TABLE songplay
(
  songplay_id  bigint IDENTITY(0,1) PRIMARY KEY,
  start_time   varchar(50) NOT NULL,
  user_id      varchar(100) NOT NULL,
  level        varchar(100),
  song_id      varchar(100) NOT NULL,
  artist_id    varchar(100) NOT NULL,
  session_id   varchar(100),
  location     varchar(100),
  user_agent   varchar(100)
);";

const CREATE_DIM_USER: &str = "\
CREATE TABLE dim_user
(
  user_id         varchar(100),
  first_name      varchar(500),
  last_name       varchar(500),
  gender          varchar(50),
  level           varchar(100)
);";

const CREATE_DIM_SONG: &str = "\
CREATE TABLE dim_song
(
  song_id           varchar(50) NOT NULL,
  title             varchar(1000),
  artist_id         varchar(50),
  year              smallint,
  duration          varchar(20)
);";

const CREATE_DIM_ARTIST: &str = "\
CREATE TABLE dim_artist
(
  artist_id         varchar(50) NOT NULL,
  name              varchar(500),
  location          varchar(1000),
  latitude          varchar(100),
  longitude         varchar(100)
);";

const CREATE_DIM_TIME: &str = "\
CREATE TABLE dim_time
(
  start_time   varchar(50) NOT NULL,
  hour         smallint NOT NULL,
  day          smallint NOT NULL,
  week         smallint NOT NULL,
  month        smallint NOT NULL,
  year         smallint NOT NULL,
  weekday      varchar(1) NOT NULL
);";

// ============ Transform inserts ============
//
// The epoch-millisecond `ts` column converts to a calendar timestamp as
// `TIMESTAMP 'epoch' + ts/1000 seconds`; `start_time` is the HH:MM:SS slice
// of that timestamp's text form.

const INSERT_DIM_USER: &str = "\
INSERT INTO dim_user (user_id, first_name, last_name, gender, level)
SELECT DISTINCT userId     AS user_id,
       firstName           AS first_name,
       lastName            AS last_name,
       gender              AS gender,
       level               AS level
FROM stage_events;";

const INSERT_DIM_SONG: &str = "\
INSERT INTO dim_song (song_id, title, artist_id, year, duration)
SELECT DISTINCT song_id    AS song_id,
       title               AS title,
       artist_id           AS artist_id,
       CAST(year AS smallint) AS year,
       duration            AS duration
FROM stage_songs;";

const INSERT_DIM_ARTIST: &str = "\
INSERT INTO dim_artist (artist_id, name, location, latitude, longitude)
SELECT DISTINCT artist_id  AS artist_id,
       artist_name         AS name,
       artist_location     AS location,
       artist_latitude     AS latitude,
       artist_longitude    AS longitude
FROM stage_songs;";

const INSERT_DIM_TIME: &str = "\
INSERT INTO dim_time (start_time, hour, day, week, month, year, weekday)
SELECT DISTINCT SUBSTRING(CAST(TIMESTAMP 'epoch' + CAST(ts AS bigint) / 1000 * INTERVAL '1 second' AS varchar), 12, 8) AS start_time,
       EXTRACT(hour FROM TIMESTAMP 'epoch' + CAST(ts AS bigint) / 1000 * INTERVAL '1 second')  AS hour,
       EXTRACT(day FROM TIMESTAMP 'epoch' + CAST(ts AS bigint) / 1000 * INTERVAL '1 second')   AS day,
       EXTRACT(week FROM TIMESTAMP 'epoch' + CAST(ts AS bigint) / 1000 * INTERVAL '1 second')  AS week,
       EXTRACT(month FROM TIMESTAMP 'epoch' + CAST(ts AS bigint) / 1000 * INTERVAL '1 second') AS month,
       EXTRACT(year FROM TIMESTAMP 'epoch' + CAST(ts AS bigint) / 1000 * INTERVAL '1 second')  AS year,
       CASE WHEN EXTRACT(dayofweek FROM TIMESTAMP 'epoch' + CAST(ts AS bigint) / 1000 * INTERVAL '1 second') IN (6, 7) THEN 'N' ELSE 'Y' END AS weekday
FROM stage_events;";

// No DISTINCT here: every event row that matches a song title becomes a
// fact row, including the fan-out when several songs share a title.
const INSERT_SONGPLAY: &str = "\
INSERT INTO songplay (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
SELECT SUBSTRING(CAST(TIMESTAMP 'epoch' + CAST(ts AS bigint) / 1000 * INTERVAL '1 second' AS varchar), 12, 8) AS start_time,
       userId              AS user_id,
       level               AS level,
       song_id             AS song_id,
       artist_id           AS artist_id,
       sessionId           AS session_id,
       location            AS location,
       userAgent           AS user_agent
FROM stage_events, dim_song
WHERE song = title;";

/// Insert order: `dim_song` must be populated before `songplay` reads it as
/// a join target. The other dimensions carry no ordering dependency.
const INSERT_ORDER: [(Table, &str); 5] = [
    (Table::DimUser, INSERT_DIM_USER),
    (Table::DimSong, INSERT_DIM_SONG),
    (Table::DimArtist, INSERT_DIM_ARTIST),
    (Table::DimTime, INSERT_DIM_TIME),
    (Table::Songplay, INSERT_SONGPLAY),
];

/// A single ready-to-execute statement, labeled with the table it targets.
#[derive(Debug, Clone)]
pub struct Statement {
    pub table: Table,
    pub sql: String,
}

/// The four ordered statement lists the driver executes: drops, creates,
/// copies, inserts.
///
/// Built once from the configuration (the IAM role ARN and object-storage
/// locations resolve here, exactly once) and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct QuerySet {
    drop_table_queries: Vec<Statement>,
    create_table_queries: Vec<Statement>,
    copy_table_queries: Vec<Statement>,
    insert_table_queries: Vec<Statement>,
}

impl QuerySet {
    pub fn new(config: &Config) -> Self {
        let drop_table_queries = Table::ALL
            .iter()
            .map(|table| Statement {
                table: *table,
                sql: table.drop_sql(),
            })
            .collect();

        let create_table_queries = Table::ALL
            .iter()
            .map(|table| Statement {
                table: *table,
                sql: table.create_sql().to_string(),
            })
            .collect();

        let copy_table_queries = vec![
            Statement {
                table: Table::StageEvents,
                sql: copy_sql(Table::StageEvents, &config.s3.log_data, config),
            },
            Statement {
                table: Table::StageSongs,
                sql: copy_sql(Table::StageSongs, &config.s3.song_data, config),
            },
        ];

        let insert_table_queries = INSERT_ORDER
            .iter()
            .map(|(table, sql)| Statement {
                table: *table,
                sql: (*sql).to_string(),
            })
            .collect();

        QuerySet {
            drop_table_queries,
            create_table_queries,
            copy_table_queries,
            insert_table_queries,
        }
    }

    pub fn drop_table_queries(&self) -> &[Statement] {
        &self.drop_table_queries
    }

    pub fn create_table_queries(&self) -> &[Statement] {
        &self.create_table_queries
    }

    pub fn copy_table_queries(&self) -> &[Statement] {
        &self.copy_table_queries
    }

    pub fn insert_table_queries(&self) -> &[Statement] {
        &self.insert_table_queries
    }
}

/// Bulk-load statement: the engine ingests newline-delimited JSON straight
/// from object storage, authenticating with the configured role.
fn copy_sql(table: Table, location: &str, config: &Config) -> String {
    format!(
        "COPY {} FROM '{}'\n\
         CREDENTIALS 'aws_iam_role={}'\n\
         FORMAT AS JSON 'auto'\n\
         REGION '{}';",
        table.name(),
        location,
        config.iam_role.arn,
        config.s3.region
    )
}
