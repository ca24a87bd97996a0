use url::Url;

/// `GET {base}/search?keywords=..&type=1&limit=..&offset=0`; type 1 is songs.
pub fn search_url(base: &str, keyword: &str, limit: u32) -> Result<Url, url::ParseError> {
    let mut url = endpoint(base, "search")?;
    url.query_pairs_mut()
        .append_pair("keywords", keyword)
        .append_pair("type", "1")
        .append_pair("limit", &limit.to_string())
        .append_pair("offset", "0");
    Ok(url)
}

pub fn lyric_url(base: &str, song_id: u64) -> Result<Url, url::ParseError> {
    let mut url = endpoint(base, "lyric")?;
    url.query_pairs_mut().append_pair("id", &song_id.to_string());
    Ok(url)
}

fn endpoint(base: &str, path: &str) -> Result<Url, url::ParseError> {
    let base = format!("{}/", base.trim().trim_end_matches('/'));
    Url::parse(&base)?.join(path)
}
