use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS chat_rooms (
            id          INTEGER PRIMARY KEY,
            member1     TEXT NOT NULL,
            member2     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS together_rooms (
            id          INTEGER PRIMARY KEY,
            together_id TEXT NOT NULL,
            members     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Messages deliberately carry no foreign key to their room table:
        -- appends to a room id with no room record must still succeed.
        CREATE TABLE IF NOT EXISTS chat_messages (
            id          TEXT PRIMARY KEY,
            room_id     INTEGER NOT NULL,
            sender_id   TEXT NOT NULL,
            message     TEXT NOT NULL,
            write_day   TEXT NOT NULL,
            read        INTEGER NOT NULL DEFAULT 0,
            seq         INTEGER NOT NULL,
            created_at  TEXT NOT NULL,
            UNIQUE(room_id, seq)
        );

        CREATE INDEX IF NOT EXISTS idx_chat_messages_room
            ON chat_messages(room_id, seq);

        CREATE TABLE IF NOT EXISTS together_messages (
            id          TEXT PRIMARY KEY,
            room_id     INTEGER NOT NULL,
            sender_id   TEXT NOT NULL,
            message     TEXT NOT NULL,
            write_day   TEXT NOT NULL,
            read        INTEGER NOT NULL DEFAULT 0,
            seq         INTEGER NOT NULL,
            created_at  TEXT NOT NULL,
            UNIQUE(room_id, seq)
        );

        CREATE INDEX IF NOT EXISTS idx_together_messages_room
            ON together_messages(room_id, seq);
        ",
    )?;

    info!("Store migrations complete");
    Ok(())
}
