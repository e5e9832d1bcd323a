//! Common test utilities: fixture pages and fast-path configurations

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use masothue::cache::{CacheConfig, ResultCache};
use masothue::client::Client;
use masothue::config::Config;
use masothue::crawler::fetcher::{Fetcher, FetcherConfig};
use masothue::crawler::rate_limiter::{RateLimiter, RateLimiterConfig};
use masothue::utils::retry::RetryPolicy;

/// Company page for 3604062974, shaped like the live site
pub const DETAIL_HTML: &str = r##"<!DOCTYPE html>
<html lang="vi">
<head><meta charset="utf-8"><title>3604062974 - CÔNG TY TNHH ABC</title></head>
<body>
<h1>3604062974 - CÔNG TY TNHH ABC</h1>
<table class="table-taxinfo">
  <thead>
    <tr><th itemprop="name" colspan="2"><span class="copy">CÔNG TY TNHH ABC</span></th></tr>
  </thead>
  <tbody>
    <tr><td><i class="fa fa-hashtag"></i> Mã số thuế</td><td itemprop="taxID"><span class="copy">3604062974</span></td></tr>
    <tr><td>Địa chỉ Thuế</td><td itemprop="address"><span class="copy">Số 12, Đường 3A, KCN Biên Hòa II, Đồng Nai</span></td></tr>
    <tr><td>Địa chỉ</td><td>Số 12 Đường 3A, Phường An Bình, TP Biên Hòa, Đồng Nai</td></tr>
    <tr><td>Tình trạng</td><td>Đang hoạt động (đã được cấp GCN ĐKT)</td></tr>
    <tr itemprop="alumni"><td>Người đại diện</td><td><span itemprop="name"><a href="#">NGUYỄN VĂN A</a></span></td></tr>
    <tr><td>Điện thoại</td><td itemprop="telephone">Bị ẩn theo yêu cầu người dùng</td></tr>
    <tr><td>Ngày hoạt động</td><td><span>2008-07-15</span></td></tr>
    <tr><td>Quản lý bởi</td><td>Cục Thuế Tỉnh Đồng Nai</td></tr>
    <tr><td>Loại hình DN</td><td>Công ty trách nhiệm hữu hạn ngoài NN</td></tr>
  </tbody>
</table>
<h3>Ngành nghề kinh doanh</h3>
<table class="table">
  <thead><tr><th>Mã</th><th>Ngành</th></tr></thead>
  <tbody>
    <tr><td><a href="/tra-cuu-ma-so-thue-theo-nganh-nghe/4610">4610</a></td><td><a>Đại lý, môi giới, đấu giá</a></td></tr>
    <tr><td><a href="/tra-cuu-ma-so-thue-theo-nganh-nghe/2511">2511</a></td><td><a><strong>Sản xuất các cấu kiện kim loại</strong></a></td></tr>
  </tbody>
</table>
</body>
</html>"##;

/// Search listing where the exact tax ID is the second hit
pub const SEARCH_HTML: &str = r#"<!DOCTYPE html>
<html lang="vi">
<head><meta charset="utf-8"><title>Tìm kiếm</title></head>
<body>
<div class="tax-listing">
  <div data-prefetch="/0100109106-tap-doan-viettel">
    <h3><a href="/0100109106-tap-doan-viettel">TẬP ĐOÀN CÔNG NGHIỆP - VIỄN THÔNG QUÂN ĐỘI</a></h3>
    <div><i class="fa fa-hashtag"></i> Mã số thuế: <a href="/0100109106-tap-doan-viettel">0100109106</a></div>
    <div><i class="fa fa-user"></i> Người đại diện: <em>TÀO ĐỨC THẮNG</em></div>
    <address>Lô D26, Khu đô thị mới Cầu Giấy, Hà Nội</address>
  </div>
  <div data-prefetch="/3604062974-cong-ty-tnhh-abc">
    <h3><a href="/3604062974-cong-ty-tnhh-abc">CÔNG TY TNHH ABC</a></h3>
    <div><i class="fa fa-hashtag"></i> Mã số thuế: <a href="/3604062974-cong-ty-tnhh-abc">3604062974</a></div>
    <div><i class="fa fa-user"></i> Người đại diện: <em>NGUYỄN VĂN A</em></div>
    <address>Số 12 Đường 3A, Phường An Bình, TP Biên Hòa, Đồng Nai</address>
  </div>
</div>
</body>
</html>"#;

/// Search page with no results
pub const EMPTY_SEARCH_HTML: &str = r#"<!DOCTYPE html>
<html><body><div class="tax-listing"></div><p>Không tìm thấy kết quả</p></body></html>"#;

/// Page carrying a reCAPTCHA widget
pub const CAPTCHA_HTML: &str = r#"<!DOCTYPE html>
<html><body>
<form action="/verify" method="post">
  <div class="g-recaptcha" data-sitekey="6Lc_test_key"></div>
</form>
</body></html>"#;

/// Rate limiter with no pacing gap and a generous window
pub fn fast_limiter() -> Arc<RateLimiter> {
    Arc::new(RateLimiter::new(RateLimiterConfig {
        max_requests: 1000,
        time_window: Duration::from_secs(60),
        min_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
        random_delay: false,
    }))
}

/// Fetcher against `base_url` with short backoff and no block cool-down
pub fn fast_fetcher(base_url: &str, max_retries: u32) -> Fetcher {
    let config = FetcherConfig {
        base_url: base_url.to_string(),
        request_timeout: Duration::from_secs(5),
        retry: RetryPolicy::new(max_retries, Duration::from_millis(10)),
        blocked_cooldown: Duration::ZERO,
        user_agents: Vec::new(),
    };
    Fetcher::new(config, fast_limiter()).unwrap()
}

/// Cache rooted in `dir` with default expiry
pub fn test_cache(dir: &Path) -> ResultCache {
    ResultCache::new(CacheConfig {
        dir: dir.to_path_buf(),
        ..Default::default()
    })
}

/// Client wired to a mock server and a temporary cache directory
pub fn test_client(base_url: &str, cache_dir: &Path) -> Client {
    Client::new(
        Arc::new(fast_fetcher(base_url, 2)),
        Arc::new(test_cache(cache_dir)),
    )
}

/// Full configuration for a mock server, no pacing
pub fn test_config(base_url: &str, cache_dir: &Path) -> Config {
    let mut config = Config::default();
    config.http.base_url = base_url.to_string();
    config.http.retry_delay_secs = 0.01;
    config.http.blocked_cooldown_secs = 0;
    config.rate_limit.max_requests = 1000;
    config.rate_limit.min_delay_secs = 0.0;
    config.rate_limit.max_delay_secs = 0.0;
    config.rate_limit.random_delay = false;
    config.cache.dir = cache_dir.to_path_buf();
    config
}
