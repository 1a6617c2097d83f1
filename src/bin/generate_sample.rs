use chrono::{Duration, NaiveDate};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64() * (hi - lo)
    }

    fn pick(&mut self, items: &[&'static str]) -> &'static str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

struct Agent {
    group: &'static str,
    leader: &'static str,
    supervisor: &'static str,
    classification: &'static str,
    channel: &'static str,
}

fn roster(rng: &mut SimpleRng) -> Vec<Agent> {
    let teams: [(&str, &str, &str); 6] = [
        ("Alpha", "Tina", "Sofia"),
        ("Alpha", "Tom", "Sofia"),
        ("Bravo", "Bea", "Sofia"),
        ("Bravo", "Ben", "Marco"),
        ("Charlie", "Carl", "Marco"),
        ("Charlie", "Cora", "Marco"),
    ];
    let classifications = ["New case", "Existing", "Late stage"];
    let channels = ["Inhouse", "Vendor"];

    let mut agents = Vec::new();
    for (group, leader, supervisor) in teams {
        for _ in 0..4 {
            agents.push(Agent {
                group,
                leader,
                supervisor,
                classification: rng.pick(&classifications),
                channel: rng.pick(&channels),
            });
        }
    }
    agents
}

fn main() {
    let mut rng = SimpleRng::new(42);
    let agents = roster(&mut rng);

    let start = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
    let out_path = "sample_callcenter.csv";
    let mut writer = csv::Writer::from_path(out_path).expect("creating output CSV");

    writer
        .write_record([
            "Date",
            "Group",
            "Team leader",
            "Supervisor",
            "Work mode",
            "Classification",
            "Channel type",
            "Talk duration",
            "Dialing quantity",
            "Dialing connected",
            "SMS quantity",
            "Collected assigned",
            "Collected principal",
        ])
        .expect("writing header");

    let work_modes = ["WFH", "Onsite"];
    let mut rows = 0usize;
    for day in 0..90 {
        let date = start + Duration::days(day);
        for agent in &agents {
            // Weekends are quiet: most agents are off.
            let weekend = matches!(
                date.format("%a").to_string().as_str(),
                "Sat" | "Sun"
            );
            if weekend && rng.next_f64() < 0.7 {
                continue;
            }

            let work_mode = rng.pick(&work_modes);
            let dialing = rng.range(40.0, 180.0).round();
            let connected = (dialing * rng.range(0.2, 0.6)).round();
            let talk = rng.range(30.0, 240.0);
            let sms = rng.range(0.0, 25.0).round();
            let assigned = rng.range(0.0, 5_000.0).round();
            // Occasionally nothing is assigned; collection stays 0 too.
            let (assigned, principal) = if assigned < 250.0 {
                (0.0, 0.0)
            } else {
                (assigned, (assigned * rng.range(0.0, 0.8)).round())
            };

            writer
                .write_record([
                    date.format("%Y-%m-%d").to_string(),
                    agent.group.to_string(),
                    agent.leader.to_string(),
                    agent.supervisor.to_string(),
                    work_mode.to_string(),
                    agent.classification.to_string(),
                    agent.channel.to_string(),
                    format!("{talk:.1}"),
                    format!("{dialing}"),
                    format!("{connected}"),
                    format!("{sms}"),
                    format!("{assigned}"),
                    format!("{principal}"),
                ])
                .expect("writing row");
            rows += 1;
        }
    }

    writer.flush().expect("flushing output");
    println!("Wrote {rows} records to {out_path}");
}
