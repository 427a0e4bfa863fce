pub mod torrent_cleanup;
pub mod tracker_apis;
pub mod udp_tracker;
