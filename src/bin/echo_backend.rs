//! A minimal stand-in backend for exercising `frontproxy` by hand: accepts
//! connections, reads one request header, and writes back a small fixed
//! response. Adapted from the teacher's `hp-echo` bin, stripped of the
//! io_uring runtime and keep-alive pooling (this binary's job is just to
//! give the proxy something real to dial against during manual testing,
//! not to demonstrate the spec itself).

use std::env;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

const RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 13\r\nConnection: close\r\n\r\nHello, World!";

fn handle(mut stream: std::net::TcpStream) {
    let mut buf = [0u8; 4096];
    let mut total = 0usize;
    loop {
        let n = match stream.read(&mut buf[total..]) {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        total += n;
        if total >= 4 && buf[..total].windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
        if total == buf.len() {
            return;
        }
    }
    let _ = stream.write_all(RESPONSE);
}

fn main() {
    let addr = env::args().nth(1).unwrap_or_else(|| "127.0.0.1:9000".to_string());
    let listener = TcpListener::bind(&addr).expect("bind echo backend");
    eprintln!("echo-backend listening on {addr}");
    for conn in listener.incoming() {
        match conn {
            Ok(stream) => {
                thread::spawn(move || handle(stream));
            }
            Err(e) => eprintln!("accept: {e}"),
        }
    }
}
