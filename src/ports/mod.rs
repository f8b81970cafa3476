pub mod feed_port;
