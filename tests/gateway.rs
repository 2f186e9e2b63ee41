mod support;

use embassy_time::Instant;
use smsgate::{Error, Modem, SmsState};

use support::{fast_config, ready_modem, FakeModem, FakePorts, BODY};

const CLIP: &str = "+CLIP: \"+420123456789\",145,\"\",0,\"\",0\r\n";

fn at(ms: u64) -> Instant {
    Instant::from_millis(ms)
}

fn scripted_send(fake: &mut FakeModem, recipient: &str, final_reply: &str) {
    fake.reply_to("AT+CMGF=1", "\r\nOK\r\n");
    fake.reply_to(&format!("AT+CMGS=\"{}\"", recipient), "\r\n> ");
    fake.reply_to(BODY, final_reply);
}

/// Ticks every 50 ms until the driver is idle with an empty queue, recording
/// every state change.
fn run_until_idle(modem: &mut Modem<FakeModem, FakePorts>, start: u64) -> (Vec<SmsState>, u64) {
    let mut states = vec![modem.state()];
    let mut t = start;
    for _ in 0..1000 {
        modem.tick(at(t)).unwrap();
        if *states.last().unwrap() != modem.state() {
            states.push(modem.state());
        }
        t += 50;
        if modem.state() == SmsState::Idle && modem.queue_size() == 0 && states.len() > 1 {
            break;
        }
    }
    (states, t)
}

#[test]
fn sms_goes_through_every_state_once() {
    let mut fake = FakeModem::auto_ok();
    scripted_send(&mut fake, "+420000111222", "\r\n+CMGS: 7\r\n\r\nOK\r\n");
    let mut modem = ready_modem(fake, FakePorts::default());

    assert!(modem.enqueue("+420000111222", "Hi"));
    let (states, _) = run_until_idle(&mut modem, 0);

    assert_eq!(
        states,
        [
            SmsState::Idle,
            SmsState::SetTextMode,
            SmsState::SendHeader,
            SmsState::WaitPrompt,
            SmsState::SendBody,
            SmsState::WaitOk,
            SmsState::Done,
            SmsState::Idle,
        ]
    );
    assert_eq!(modem.queue_size(), 0);
    assert_eq!(modem.transport().commands(), ["AT+CMGF=1", "AT+CMGS=\"+420000111222\""]);
    assert_eq!(modem.transport().bodies(), ["Hi"]);
}

#[test]
fn finished_task_reports_outcome() {
    let mut fake = FakeModem::auto_ok();
    scripted_send(&mut fake, "+420777", "\r\n+CMGS: 123\r\n");
    let mut modem = ready_modem(fake, FakePorts::default());
    modem.enqueue("+420777", "ping");

    let mut outcomes = Vec::new();
    for step in 0..40 {
        if let Some(outcome) = modem.tick(at(step * 100)).unwrap() {
            outcomes.push(outcome);
        }
    }
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].task.recipients.as_str(), "+420777");
    assert_eq!(outcomes[0].result, Ok(()));
}

#[test]
fn queue_refuses_ninth_task() {
    let mut modem = ready_modem(FakeModem::auto_ok(), FakePorts::default());
    for n in 0..8 {
        assert!(modem.enqueue(&format!("+42060000000{}", n), "load"));
        assert_eq!(modem.queue_size(), n + 1);
    }
    assert!(!modem.enqueue("+420999", "one too many"));
    assert_eq!(modem.try_enqueue("+420999", "one too many"), Err(Error::QueueFull));
    assert_eq!(modem.queue_size(), 8);
}

#[test]
fn oversized_message_is_refused() {
    let mut modem = ready_modem(FakeModem::auto_ok(), FakePorts::default());
    let long = "x".repeat(161);
    assert_eq!(modem.try_enqueue("+420", &long), Err(Error::TooLong));
    assert_eq!(modem.try_enqueue("+4201234567890123456789012", "hi"), Err(Error::TooLong));
    assert_eq!(modem.queue_size(), 0);
}

#[test]
fn status_api_reports_queue_in_order() {
    let mut modem = ready_modem(FakeModem::auto_ok(), FakePorts::default());
    modem.enqueue("A", "first");
    modem.enqueue("B", "second");
    modem.enqueue("C", "third");

    assert_eq!(modem.task_at(0).recipients.as_str(), "A");
    assert_eq!(modem.task_at(2).message.as_str(), "third");
    assert!(modem.task_at(3).is_empty());

    // A is dequeued and in flight; B and C are still waiting.
    modem.tick(at(0)).unwrap();
    modem.tick(at(10)).unwrap();
    assert_eq!(modem.current_task().unwrap().recipients.as_str(), "A");
    assert_eq!(modem.task_state_at(0), SmsState::SetTextMode);
    assert_eq!(modem.task_state_at(1), SmsState::Idle);
    assert_eq!(modem.queue_size(), 2);
    assert_eq!(modem.task_at(0).recipients.as_str(), "B");
}

#[test]
fn failed_send_does_not_block_the_queue() {
    let mut fake = FakeModem::auto_ok();
    fake.reply_to("AT+CMGF=1", "\r\nOK\r\n");
    fake.reply_to("AT+CMGS=\"+420111\"", "\r\n> ");
    fake.reply_to("AT+CMGS=\"+420222\"", "\r\n> ");
    fake.reply_to(BODY, "\r\n+CMS ERROR: 38\r\n");
    let mut modem = ready_modem(fake, FakePorts::default());

    modem.enqueue("+420111", "first");
    modem.enqueue("+420222", "second");

    let mut results = Vec::new();
    let mut t = 0;
    while results.len() < 2 && t < 60_000 {
        if let Some(outcome) = modem.tick(at(t)).unwrap() {
            results.push((outcome.task.recipients.to_string(), outcome.result));
            // Second attempt succeeds.
            modem.transport_mut().reply_to(BODY, "\r\n+CMGS: 5\r\n");
        }
        t += 50;
    }

    assert_eq!(
        results,
        [
            ("+420111".to_string(), Err(Error::ModemError)),
            ("+420222".to_string(), Ok(())),
        ]
    );
    assert_eq!(modem.queue_size(), 0);
}

#[test]
fn silent_modem_times_out_without_body() {
    let mut modem = ready_modem(FakeModem::auto_ok(), FakePorts::default());
    modem.transport_mut().set_auto_ok(false);
    modem.enqueue("+420000111222", "never sent");

    let mut outcome = None;
    let mut t = 0;
    while outcome.is_none() && t < 20_000 {
        outcome = modem.tick(at(t)).unwrap();
        t += 100;
    }

    let outcome = outcome.expect("prompt wait times out");
    assert_eq!(outcome.result, Err(Error::Timeout));
    // 200 ms header delay plus the 10 s prompt timeout
    assert!(t >= 10_200, "timed out too early at {t} ms");
    assert!(modem.transport().bodies().is_empty());
}

#[test]
fn tick_before_initialization_is_refused() {
    let mut modem = Modem::new(FakeModem::auto_ok(), fast_config(), FakePorts::default());
    modem.enqueue("+420", "early");
    assert_eq!(modem.tick(at(0)), Err(Error::NotReady));
    assert_eq!(modem.state(), SmsState::Idle);
    assert_eq!(modem.queue_size(), 1);
}

#[test]
fn caller_is_hung_up_after_first_ring() {
    let mut modem = ready_modem(FakeModem::auto_ok(), FakePorts::default());
    modem.transport_mut().push_rx(CLIP);
    modem.transport_mut().push_rx("\r\nRING\r\n");
    modem.tick(at(0)).unwrap();

    assert_eq!(modem.transport().commands(), ["ATH"]);
    assert_eq!(modem.ports().notified, ["420123456789"]);
    assert_eq!(modem.ports().call_log.len(), 1);
    let entry = modem.ports().call_log.latest().unwrap();
    assert_eq!(entry.number.as_str(), "+420123456789");
    assert_eq!(entry.timestamp.as_str(), "2025-01-31T18:30:05");

    let session = modem.call_session();
    assert!(!session.clip_seen);
    assert_eq!(session.ring_count, 0);
    assert!(!session.call_logged);
}

#[test]
fn ring_threshold_of_three_waits_for_third_ring() {
    let mut modem = ready_modem(FakeModem::auto_ok(), FakePorts::default());
    modem.set_ring_threshold(3).unwrap();
    assert_eq!(modem.ports().stored_rings, Some(3));

    modem.transport_mut().push_rx(CLIP);
    for ring in 1..=3 {
        modem.transport_mut().push_rx("RING\r\n");
        modem.tick(at(ring * 3000)).unwrap();
        if ring < 3 {
            assert!(modem.transport().commands().is_empty(), "hung up after ring {ring}");
            assert_eq!(modem.call_session().ring_count, ring as u16);
        }
    }
    assert_eq!(modem.transport().commands(), ["ATH"]);
    assert_eq!(modem.ports().call_log.len(), 1);
}

#[test]
fn calls_during_sms_do_not_disturb_the_send() {
    let mut fake = FakeModem::auto_ok();
    scripted_send(&mut fake, "+420000111222", "\r\nRING\r\n+CMGS: 44\r\n\r\nOK\r\n");
    let mut modem = ready_modem(fake, FakePorts::default());
    modem.transport_mut().push_rx(CLIP);

    assert!(modem.enqueue("+420000111222", "Hi"));
    let (states, _) = run_until_idle(&mut modem, 0);

    assert!(states.contains(&SmsState::Done));
    assert!(modem.transport().commands().iter().any(|c| c == "ATH"));
    assert_eq!(modem.ports().notified.len(), 1);
}

#[test]
fn stored_ring_threshold_is_loaded() {
    let ports = FakePorts { stored_rings: Some(5), ..FakePorts::default() };
    let modem = Modem::new(FakeModem::auto_ok(), fast_config(), ports);
    assert_eq!(modem.ring_threshold(), 5);

    let ports = FakePorts { stored_rings: Some(42), ..FakePorts::default() };
    let modem = Modem::new(FakeModem::auto_ok(), fast_config(), ports);
    assert_eq!(modem.ring_threshold(), 1);
}

#[test]
fn invalid_or_unpersisted_ring_threshold_is_rejected() {
    let mut modem = ready_modem(FakeModem::auto_ok(), FakePorts::default());
    assert_eq!(modem.set_ring_threshold(0), Err(Error::InvalidRingThreshold));
    assert_eq!(modem.set_ring_threshold(15), Err(Error::InvalidRingThreshold));
    assert_eq!(modem.ports().store_calls, 0);

    modem.ports_mut().fail_store = true;
    assert_eq!(modem.set_ring_threshold(4), Err(Error::Storage));
    assert_eq!(modem.ring_threshold(), 1);
}

#[test]
fn call_log_keeps_ten_newest_calls() {
    let mut modem = ready_modem(FakeModem::auto_ok(), FakePorts::default());
    for n in 0..11 {
        modem
            .transport_mut()
            .push_rx(&format!("+CLIP: \"+42060000{:04}\",145\r\nRING\r\n", n));
        modem.tick(at(n * 1000)).unwrap();
    }
    let log = &modem.ports().call_log;
    assert_eq!(log.len(), 10);
    assert_eq!(log.get(0).unwrap().number.as_str(), "+420600000001");
    assert_eq!(log.latest().unwrap().number.as_str(), "+420600000010");
}

/// Ticks every 50 ms until the send state machine reaches `state`.
fn run_until_state(modem: &mut Modem<FakeModem, FakePorts>, state: SmsState, start: u64) -> u64 {
    let mut t = start;
    while modem.state() != state {
        assert!(t < 60_000, "never reached {state:?}");
        modem.tick(at(t)).unwrap();
        t += 50;
    }
    t
}

#[test]
fn hang_up_waits_until_body_is_sent() {
    let mut fake = FakeModem::auto_ok();
    scripted_send(&mut fake, "+420000111222", "\r\n+CMGS: 9\r\n\r\nOK\r\n");
    let mut modem = ready_modem(fake, FakePorts::default());
    modem.enqueue("+420000111222", "Hi");

    let t = run_until_state(&mut modem, SmsState::SendBody, 0);
    modem.transport_mut().push_rx(&format!("\r\n{CLIP}\r\nRING\r\n"));
    modem.tick(at(t)).unwrap();
    assert!(modem.hangup_pending());
    assert!(!modem.transport().commands().iter().any(|c| c == "ATH"));

    run_until_idle(&mut modem, t + 50);

    assert!(!modem.hangup_pending());
    assert_eq!(modem.transport().bodies(), ["Hi"]);
    let written = modem.transport().written_text();
    let body_end = written.find("Hi\x1a").expect("body written");
    let hangup = written.find("ATH\r\n").expect("hang-up written");
    assert!(hangup > body_end, "ATH leaked into the message: {written:?}");
}

#[test]
fn hang_up_is_immediate_while_idle() {
    let mut modem = ready_modem(FakeModem::auto_ok(), FakePorts::default());
    modem.transport_mut().push_rx(CLIP);
    modem.transport_mut().push_rx("RING\r\n");
    modem.poll_serial();
    assert!(!modem.hangup_pending());
    assert_eq!(modem.transport().commands(), ["ATH"]);
}

#[test]
fn blocking_helper_is_refused_mid_send() {
    let mut fake = FakeModem::auto_ok();
    scripted_send(&mut fake, "+420000111222", "\r\n+CMGS: 3\r\n\r\nOK\r\n");
    fake.reply_to("AT+CSQ", "\r\n+CSQ: 20,0\r\n\r\nOK\r\n");
    let mut modem = ready_modem(fake, FakePorts::default());
    modem.enqueue("+420000111222", "Hi");

    let t = run_until_state(&mut modem, SmsState::WaitPrompt, 0);
    assert!(matches!(modem.commands(), Err(Error::Busy)));

    let mut outcome = None;
    let mut now = t;
    while outcome.is_none() {
        assert!(now < 60_000);
        outcome = modem.tick(at(now)).unwrap();
        now += 50;
    }
    assert_eq!(outcome.unwrap().result, Ok(()));

    run_until_idle(&mut modem, now);
    assert_eq!(modem.commands().unwrap().signal_quality(), 20);
}
