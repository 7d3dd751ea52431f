pub const SCHEMA: &str = r#"
-- Blog posts; content holds the editor's JSON document
CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    content TEXT NOT NULL DEFAULT '{}',
    excerpt TEXT,
    status TEXT NOT NULL DEFAULT 'draft',
    published_at TEXT,
    cover_image_url TEXT,
    ogp_image_url TEXT,
    view_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Portfolio works
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    description TEXT,
    content TEXT NOT NULL DEFAULT '{}',
    demo_url TEXT,
    github_url TEXT,
    cover_image_url TEXT,
    gallery_images TEXT NOT NULL DEFAULT '[]',  -- JSON array of URLs
    start_date TEXT,
    end_date TEXT,
    status TEXT NOT NULL DEFAULT 'registered',
    steps_count INTEGER,
    used_ai TEXT NOT NULL DEFAULT '[]',         -- JSON array of tool names
    tech_stack TEXT NOT NULL DEFAULT '{}',      -- JSON object language -> percent
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS tags (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    slug TEXT NOT NULL UNIQUE,
    description TEXT,
    color TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Progress tracker
CREATE TABLE IF NOT EXISTS in_progress (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'not_started',
    progress_rate INTEGER NOT NULL DEFAULT 0,
    started_at TEXT,
    completed_at TEXT,
    -- Weak reference: cleared when the project goes away
    completed_project_id TEXT REFERENCES projects(id) ON DELETE SET NULL,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Singleton pages keyed by type (home, about, links)
CREATE TABLE IF NOT EXISTS pages (
    id TEXT PRIMARY KEY,
    page_type TEXT NOT NULL UNIQUE,
    content TEXT NOT NULL DEFAULT '{}',
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Many-to-many relationship between posts and tags
CREATE TABLE IF NOT EXISTS post_tags (
    post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    tag_id TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (post_id, tag_id)
);

-- Many-to-many relationship between projects and tags
CREATE TABLE IF NOT EXISTS project_tags (
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    tag_id TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (project_id, tag_id)
);

-- Manually curated related posts (directed)
CREATE TABLE IF NOT EXISTS post_links (
    post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    related_post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    PRIMARY KEY (post_id, related_post_id)
);

-- Projects referenced from a post (directed)
CREATE TABLE IF NOT EXISTS post_project_links (
    post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    PRIMARY KEY (post_id, project_id)
);

-- Create indexes
CREATE INDEX IF NOT EXISTS idx_posts_status ON posts(status, published_at);
CREATE INDEX IF NOT EXISTS idx_projects_status ON projects(status);
CREATE INDEX IF NOT EXISTS idx_post_tags_tag ON post_tags(tag_id);
CREATE INDEX IF NOT EXISTS idx_project_tags_tag ON project_tags(tag_id);
CREATE INDEX IF NOT EXISTS idx_post_links_related ON post_links(related_post_id);
CREATE INDEX IF NOT EXISTS idx_post_project_links_project ON post_project_links(project_id);
CREATE INDEX IF NOT EXISTS idx_in_progress_project ON in_progress(completed_project_id);
"#;
