// Generated child keys: 8 characters of millisecond timestamp followed by 12
// random characters, all from an alphabet that sorts in ASCII order. Keys made
// by one generator are strictly increasing.

use chrono::Utc;
use rand::Rng;
use std::sync::Mutex;

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";
const RANDOM_LEN: usize = 12;

#[derive(Default)]
struct KeyState {
    last_millis: i64,
    last_random: [u8; RANDOM_LEN],
}

#[derive(Default)]
pub struct PushKeyGenerator {
    state: Mutex<KeyState>,
}

impl PushKeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_key(&self) -> String {
        self.key_at(Utc::now().timestamp_millis())
    }

    fn key_at(&self, now_millis: i64) -> String {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        // A clock that steps backwards must not break ordering.
        let millis = now_millis.max(state.last_millis);
        if millis == state.last_millis {
            for digit in state.last_random.iter_mut().rev() {
                if *digit == 63 {
                    *digit = 0;
                } else {
                    *digit += 1;
                    break;
                }
            }
        } else {
            state.last_millis = millis;
            let mut rng = rand::thread_rng();
            for digit in state.last_random.iter_mut() {
                *digit = rng.gen_range(0..64);
            }
        }

        let mut time_chars = [0u8; 8];
        let mut remaining = millis.max(0) as u64;
        for slot in time_chars.iter_mut().rev() {
            *slot = PUSH_CHARS[(remaining % 64) as usize];
            remaining /= 64;
        }

        time_chars
            .iter()
            .chain(state.last_random.iter().map(|&i| &PUSH_CHARS[i as usize]))
            .map(|&c| c as char)
            .collect()
    }
}
