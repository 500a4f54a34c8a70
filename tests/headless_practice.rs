use std::sync::mpsc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use phrasedrill::audio::SilentAudio;
use phrasedrill::clock::{Clock, FixedClock};
use phrasedrill::practice::{Practice, PracticeConfig};
use phrasedrill::reveal::CharUnits;
use phrasedrill::runtime::{Action, DrillEvent, Runner, TestEventSource};
use phrasedrill::session::RevealState;
use phrasedrill::ui::PracticeView;
use phrasedrill::{Phrase, Rating};
use ratatui::{backend::TestBackend, Terminal};

fn key(c: char) -> DrillEvent {
    DrillEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

fn enter() -> DrillEvent {
    DrillEvent::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE))
}

// Headless practice using the internal runtime without a TTY.
// Keys go through the same Action mapping the terminal host uses.
#[test]
fn headless_practice_flow_reviews_every_due_phrase() {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    let mut phrases = vec![
        Phrase::new("hello", "你好", "nǐ hǎo", start),
        Phrase::new("thanks", "谢谢", "xièxie", start),
    ];
    let clock = FixedClock::new(start);
    let config = PracticeConfig {
        auto_play_audio: false,
        ..Default::default()
    };

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(TestEventSource::new(rx), Duration::from_millis(5));

    // prompt -> pronunciation -> 你 -> 好 -> easy, then the same with hard
    for ev in [enter(), enter(), enter(), enter(), key('e')] {
        tx.send(ev).unwrap();
    }
    for ev in [enter(), enter(), enter(), enter(), key('h')] {
        tx.send(ev).unwrap();
    }

    let mut terminal = Terminal::new(TestBackend::new(60, 16)).unwrap();
    let reviewed = {
        let mut practice = Practice::start(&mut phrases, &CharUnits, config, SilentAudio, &clock);

        for _ in 0..200u32 {
            match runner.next_action() {
                Some(Action::Reveal) => {
                    practice.advance_reveal().unwrap();
                }
                Some(Action::Rate(rating)) => {
                    practice.submit_rating(rating).unwrap();
                }
                _ => {}
            }
            terminal
                .draw(|f| {
                    let view = PracticeView::new(
                        practice.state(),
                        practice.session().current_phrase(),
                        practice.masked_units(),
                        practice.clock().now(),
                        practice.session().reviewed().len(),
                    );
                    f.render_widget(&view, f.area());
                })
                .unwrap();
            if practice.state().is_finished() {
                break;
            }
        }

        assert_eq!(practice.state().reveal_state, RevealState::Empty);
        let rendered: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(rendered.contains("All caught up!"));

        practice.finish().reviewed().len()
    };

    assert_eq!(reviewed, 2);
    assert_eq!(phrases[0].repetition_count, 1);
    assert_eq!(phrases[1].repetition_count, 0);
    assert!(phrases[1].next_due_at > start);
}

#[test]
fn headless_rating_keys_are_ignored_until_fully_revealed() {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    let mut phrases = vec![Phrase::new("hello", "你好", "nǐ hǎo", start)];
    let clock = FixedClock::new(start);
    let mut practice = Practice::start(
        &mut phrases,
        &CharUnits,
        PracticeConfig::default(),
        SilentAudio,
        &clock,
    );

    practice.advance_reveal().unwrap();
    let state = practice.submit_rating(Rating::Easy).unwrap();
    assert_eq!(state.reveal_state, RevealState::ShowPronunciation);
    assert!(practice.session().reviewed().is_empty());
}
