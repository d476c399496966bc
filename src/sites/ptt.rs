//! The PTT bulletin board web frontend
//!
//! A crawl cycle starts from the boards listed on the hot-boards page. Board
//! index pages link to older index pages (the paging buttons) and to posts;
//! posts themselves are cached but not followed.

use crate::crawler::{default_blob_name, EntryPoints, Pages, RequestParams, Site};
use crate::sites::html;
use crate::{ConfigError, SiteError};
use async_trait::async_trait;
use scraper::Html;
use url::Url;

const HOT_BOARDS_PATH: &str = "/bbs/hotboards.html";
const BOARD_SELECTOR: &str = ".board";
const PAGING_SELECTOR: &str = "div.btn-group-paging > a.btn";
const POST_SELECTOR: &str = "div.r-ent > div.title > a";

/// Blob directory for pages that do not belong to a board
const COMMON_DIR: &str = "common";

pub struct PttSite {
    base_url: Url,
}

impl PttSite {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        Ok(Self { base_url })
    }

    pub fn hot_boards_url(&self) -> String {
        self.url_for(HOT_BOARDS_PATH)
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// Board index URLs listed on the hot-boards page
    fn boards(&self, page: &[u8]) -> Result<Vec<String>, SiteError> {
        let url = self.hot_boards_url();
        let base = html::page_url(&url)?;
        let document = Html::parse_document(html::decode(&url, page)?);

        let boards = html::select_hrefs(&url, &document, BOARD_SELECTOR)?
            .into_iter()
            .filter_map(|href| html::resolve_link(href, &base))
            .map(|link| link.to_string())
            .collect();

        Ok(html::dedup_links(boards))
    }

    /// Directory a page's blobs are stored under: the board name, or `common`
    fn board_dir<'a>(&self, url: &'a str) -> &'a str {
        let prefix = self.url_for("/bbs/");
        let Some(rest) = url.strip_prefix(prefix.as_str()) else {
            return COMMON_DIR;
        };

        match rest.split_once('/') {
            Some((board, _)) if is_board_name(board) => board,
            _ => COMMON_DIR,
        }
    }
}

fn is_board_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

fn is_board_index(url: &Url) -> bool {
    url.path().contains("/index")
}

#[async_trait]
impl Site for PttSite {
    fn name(&self) -> &str {
        "ptt"
    }

    async fn entry_points(&self, pages: &mut Pages<'_>) -> crate::Result<EntryPoints> {
        let page = pages.get(&self.hot_boards_url()).await?;

        match self.boards(&page) {
            Ok(boards) => Ok(EntryPoints::from(boards)),
            Err(e) => {
                tracing::warn!("Unreadable hot-boards page: {}", e);
                Ok(EntryPoints::None)
            }
        }
    }

    fn extract_links(&self, url: &str, page: &[u8]) -> Result<Vec<String>, SiteError> {
        let base = html::page_url(url)?;
        if !is_board_index(&base) {
            return Ok(Vec::new());
        }

        let document = Html::parse_document(html::decode(url, page)?);
        let mut links = Vec::new();
        for css in [PAGING_SELECTOR, POST_SELECTOR] {
            links.extend(
                html::select_hrefs(url, &document, css)?
                    .into_iter()
                    .filter_map(|href| html::resolve_link(href, &base))
                    .map(|link| link.to_string()),
            );
        }

        Ok(html::dedup_links(links))
    }

    fn request_params(&self, _url: &str) -> RequestParams {
        RequestParams::new().with_cookie("over18", "1")
    }

    fn path_for(&self, url: &str, content_hash: &str) -> String {
        format!(
            "{}/{}",
            self.board_dir(url),
            default_blob_name(url, content_hash)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD_INDEX: &str = r#"
        <html><body>
        <div class="btn-group btn-group-paging">
            <a class="btn wide" href="/bbs/Gossiping/index1.html">最舊</a>
            <a class="btn wide" href="/bbs/Gossiping/index38999.html">‹ 上頁</a>
            <a class="btn wide disabled">下頁 ›</a>
        </div>
        <div class="r-ent">
            <div class="title"><a href="/bbs/Gossiping/M.1700000000.A.001.html">[問卦] first</a></div>
        </div>
        <div class="r-ent">
            <div class="title">(本文已被刪除)</div>
        </div>
        <div class="r-ent">
            <div class="title"><a href="/bbs/Gossiping/M.1700000001.A.002.html#reply">[新聞] second</a></div>
        </div>
        <a href="/bbs/Other/index.html">not a paging button</a>
        </body></html>
    "#;

    fn site() -> PttSite {
        PttSite::new("https://www.ptt.cc").unwrap()
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            PttSite::new("not a url"),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_hot_boards_url() {
        assert_eq!(site().hot_boards_url(), "https://www.ptt.cc/bbs/hotboards.html");
        assert_eq!(
            PttSite::new("http://mirror.test/").unwrap().hot_boards_url(),
            "http://mirror.test/bbs/hotboards.html"
        );
    }

    #[test]
    fn test_boards_from_hot_boards_page() {
        let page = r#"
            <html><body>
            <a class="board" href="/bbs/Gossiping/index.html">Gossiping</a>
            <a class="board" href="/bbs/C_Chat/index.html">C_Chat</a>
            <a class="board">broken</a>
            <a class="board" href="/bbs/Gossiping/index.html">again</a>
            <a href="/bbs/NBA/index.html">not a board tag</a>
            </body></html>
        "#;

        let boards = site().boards(page.as_bytes()).unwrap();
        assert_eq!(
            boards,
            vec![
                "https://www.ptt.cc/bbs/Gossiping/index.html",
                "https://www.ptt.cc/bbs/C_Chat/index.html",
            ]
        );
    }

    #[test]
    fn test_placeholder_hot_boards_page_has_no_boards() {
        let boards = site()
            .boards(crate::crawler::PLACEHOLDER_PAGE)
            .unwrap();
        assert!(EntryPoints::from(boards).into_urls().is_none());
    }

    #[test]
    fn test_extract_links_from_board_index() {
        let links = site()
            .extract_links(
                "https://www.ptt.cc/bbs/Gossiping/index39000.html",
                BOARD_INDEX.as_bytes(),
            )
            .unwrap();

        assert_eq!(
            links,
            vec![
                "https://www.ptt.cc/bbs/Gossiping/index1.html",
                "https://www.ptt.cc/bbs/Gossiping/index38999.html",
                "https://www.ptt.cc/bbs/Gossiping/M.1700000000.A.001.html",
                "https://www.ptt.cc/bbs/Gossiping/M.1700000001.A.002.html",
            ]
        );
    }

    #[test]
    fn test_posts_are_not_followed() {
        let links = site()
            .extract_links(
                "https://www.ptt.cc/bbs/Gossiping/M.1700000000.A.001.html",
                BOARD_INDEX.as_bytes(),
            )
            .unwrap();
        assert!(links.is_empty());
    }

    #[test]
    fn test_invalid_utf8_board_index() {
        let result = site().extract_links(
            "https://www.ptt.cc/bbs/Gossiping/index.html",
            &[0xff, 0xfe, 0xfd],
        );
        assert!(matches!(result, Err(SiteError::Encoding { .. })));
    }

    #[test]
    fn test_over18_cookie() {
        let params = site().request_params("https://www.ptt.cc/bbs/Gossiping/index.html");
        assert_eq!(params.cookie_header(), Some("over18=1".to_string()));
    }

    #[test]
    fn test_blob_layout_by_board() {
        let site = site();
        let post = "https://www.ptt.cc/bbs/Gossiping/M.1700000000.A.001.html";

        let path = site.path_for(post, "abc");
        assert_eq!(path, format!("Gossiping/{}", default_blob_name(post, "abc")));

        let hot = site.hot_boards_url();
        assert!(site.path_for(&hot, "abc").starts_with("common/"));
        assert!(site
            .path_for("https://elsewhere.test/bbs/X/index.html", "abc")
            .starts_with("common/"));
        assert!(site
            .path_for("https://www.ptt.cc/bbs/../index.html", "abc")
            .starts_with("common/"));
    }
}
