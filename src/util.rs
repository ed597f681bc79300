use reqwest::Url;

/// Join base url with another (possibly relative) url
pub fn join_url(current_url: &str, url: &str) -> Option<Url> {
    Url::parse(current_url).ok()?.join(url).ok()
}

pub fn get_host(url: &str) -> Option<String> {
    let url_ = Url::parse(url).ok()?;
    url_.host_str().map(|x| x.to_owned())
}

pub fn get_robot_url(url: &str) -> Option<String> {
    let mut url_ = Url::parse(url).ok()?;
    if url_.scheme() != "http" && url_.scheme() != "https" {
        return None;
    }
    url_.set_path("/robots.txt");
    url_.set_query(None);
    url_.set_fragment(None);
    Some(url_.to_string())
}

/// Resolves links found on `base_url` to absolute http(s) urls without
/// fragment. Links that can't be resolved are dropped.
pub fn normalize_urls(base_url: &str, urls: Vec<String>) -> Vec<String> {
    let mut res = vec![];
    for url in urls {
        let Some(mut req_url) = join_url(base_url, url.trim()) else {
            log::debug!("dropping unresolvable link {:?} on {}", url, base_url);
            continue;
        };
        req_url.set_fragment(None);
        if req_url.scheme() != "http" && req_url.scheme() != "https" {
            continue;
        }
        res.push(req_url.to_string());
    }
    res
}
