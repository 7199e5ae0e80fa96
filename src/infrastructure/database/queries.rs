pub(super) const UPSERT_FEED_ENTRY: &str = r#"
    INSERT INTO feed_entries (
        id, author, author_id, author_avatar, content, published,
        likes, liked_by_me, pending, visible, attachment_url, attachment_kind
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
    ON CONFLICT(id) DO UPDATE SET
        author = excluded.author,
        author_id = excluded.author_id,
        author_avatar = excluded.author_avatar,
        content = excluded.content,
        published = excluded.published,
        likes = excluded.likes,
        liked_by_me = excluded.liked_by_me,
        pending = excluded.pending,
        visible = excluded.visible,
        attachment_url = excluded.attachment_url,
        attachment_kind = excluded.attachment_kind
"#;

pub(super) const SELECT_VISIBLE_PAGE: &str = r#"
    SELECT id, author, author_id, author_avatar, content, published,
           likes, liked_by_me, pending, visible, attachment_url, attachment_kind
    FROM feed_entries
    WHERE visible = 1 AND (?2 IS NULL OR id < ?2)
    ORDER BY id DESC
    LIMIT ?1
"#;

pub(super) const SELECT_ENTRY_BY_ID: &str = r#"
    SELECT id, author, author_id, author_avatar, content, published,
           likes, liked_by_me, pending, visible, attachment_url, attachment_kind
    FROM feed_entries
    WHERE id = ?1
"#;

pub(super) const SELECT_NEWEST_VISIBLE_ID: &str = r#"
    SELECT MAX(id) AS id FROM feed_entries WHERE visible = 1
"#;

pub(super) const DELETE_ENTRY_BY_ID: &str = r#"
    DELETE FROM feed_entries WHERE id = ?1
"#;

pub(super) const MARK_ALL_VISIBLE: &str = r#"
    UPDATE feed_entries SET visible = 1 WHERE visible = 0
"#;

pub(super) const DELETE_ALL_ENTRIES: &str = r#"
    DELETE FROM feed_entries
"#;

pub(super) const UPSERT_REMOTE_KEY: &str = r#"
    INSERT INTO remote_keys (kind, id) VALUES (?1, ?2)
    ON CONFLICT(kind) DO UPDATE SET id = excluded.id
"#;

pub(super) const SELECT_REMOTE_KEY: &str = r#"
    SELECT id FROM remote_keys WHERE kind = ?1
"#;

pub(super) const COUNT_REMOTE_KEYS: &str = r#"
    SELECT COUNT(*) AS count FROM remote_keys
"#;

pub(super) const DELETE_REMOTE_KEYS: &str = r#"
    DELETE FROM remote_keys
"#;
