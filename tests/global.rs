//! The process-wide table is shared by every test in this binary, so each test
//! uses its own descriptors.

use std::io;
use std::time::{Duration, Instant};

use futures_epoll::global::{
    self, clear_readiness, epoll_create, epoll_create1, epoll_ctl, epoll_wait, raise_event,
    set_readiness,
};
use futures_epoll::{Event, Ready, Token, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD};

fn readable(token: u64) -> Event {
    Event::new(Ready::readable(), Token(token))
}

#[futures_epoll::test]
async fn set_readiness_wakes_waiter() {
    let _ = env_logger::try_init();
    let epfd = epoll_create1(0).unwrap();
    epoll_ctl(epfd, EPOLL_CTL_ADD, 9001, readable(91)).unwrap();

    set_readiness(9001, Ready::readable());
    let events = epoll_wait(epfd, 8, -1).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events.get(0).unwrap().token(), Token(91));

    clear_readiness(9001, Ready::readable());
    assert!(global::readiness().get(9001).is_empty());
}

#[futures_epoll::test]
async fn standing_readiness_seen_at_registration() {
    let _ = env_logger::try_init();
    set_readiness(9002, Ready::readable());

    let epfd = epoll_create(1).unwrap();
    epoll_ctl(epfd, EPOLL_CTL_ADD, 9002, readable(92)).unwrap();

    let events = epoll_wait(epfd, 8, 0).await.unwrap();
    assert_eq!(events.get(0).unwrap().token(), Token(92));
    clear_readiness(9002, Ready::all());
}

#[futures_epoll::test]
async fn bounded_wait_times_out() {
    let _ = env_logger::try_init();
    let epfd = epoll_create1(0).unwrap();
    epoll_ctl(epfd, EPOLL_CTL_ADD, 9003, readable(93)).unwrap();

    let start = Instant::now();
    let events = epoll_wait(epfd, 8, 20).await.unwrap();
    assert!(events.is_empty());
    assert!(start.elapsed() >= Duration::from_millis(20));
}

#[futures_epoll::test]
async fn raise_event_reaches_every_instance() {
    let _ = env_logger::try_init();
    let first = epoll_create1(0).unwrap();
    let second = epoll_create1(0).unwrap();
    epoll_ctl(first, EPOLL_CTL_ADD, 9004, readable(1)).unwrap();
    epoll_ctl(second, EPOLL_CTL_ADD, 9004, readable(2)).unwrap();

    raise_event(9004, Ready::readable());
    let a = epoll_wait(first, 8, -1).await.unwrap();
    let b = epoll_wait(second, 8, -1).await.unwrap();
    assert_eq!(a.get(0).unwrap().token(), Token(1));
    assert_eq!(b.get(0).unwrap().token(), Token(2));
}

#[test]
fn ctl_rejects_unknown_op_and_missing_fd() {
    let epfd = epoll_create1(0).unwrap();

    let err = epoll_ctl(epfd, 9, 9005, readable(5)).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

    let err = epoll_ctl(epfd, EPOLL_CTL_DEL, 9005, readable(5)).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::NotFound);

    let err = epoll_ctl(epfd, EPOLL_CTL_MOD, 9005, readable(5)).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::NotFound);

    assert!(global::handle().instances() >= 1);
}
