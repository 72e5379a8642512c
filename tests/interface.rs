use std::sync::Arc;
use std::sync::mpsc;

use basket_analysis::clique::MaximalCliqueFindingParameters;
use basket_analysis::error::BasketError;
use basket_analysis::interface::JobInterface;
use basket_analysis::item::Item;
use basket_analysis::mining::{Miner, MiningObserver, MiningParameters, MiningStage};

fn transactions() -> Vec<Vec<Item>> {
    let a = Item::new(1, "A", false);
    let b = Item::new(2, "B", false);
    let c = Item::new(3, "C", false);
    vec![
        vec![a.clone(), b.clone(), c.clone()],
        vec![a.clone(), b.clone()],
        vec![b.clone(), c.clone()],
        vec![a, c],
    ]
}

#[test]
fn mining_then_clique_search_in_background() {
    let interface = JobInterface::default();
    let parameters = MiningParameters::new(0.0, 0.0).expect("valid parameters");
    let mining = interface
        .start_mining(transactions(), parameters)
        .expect("job starts");
    let rules = mining.join().expect("mining succeeds");
    assert_eq!(rules.len(), 6);

    let clique = interface
        .start_clique_search(rules, MaximalCliqueFindingParameters::new(2, 3, true).expect("valid parameters"))
        .expect("job starts");
    let cliques = clique.join().expect("search succeeds");
    assert_eq!(cliques.len(), 1);
    assert_eq!(cliques[0].len(), 6);
    assert!(interface.active_jobs().expect("registry lock").is_empty());
}

/// Holds the mining job in its first stage until the test releases it.
struct Gate {
    entered: mpsc::SyncSender<()>,
    release: std::sync::Mutex<mpsc::Receiver<()>>,
}

impl MiningObserver for Gate {
    fn stage_changed(&self, stage: MiningStage) {
        if stage == MiningStage::FrequentItemSearch {
            let _ = self.entered.send(());
            if let Ok(release) = self.release.lock() {
                let _ = release.recv();
            }
        }
    }
}

#[test]
fn jobs_can_be_cancelled_by_id() {
    let (entered, on_entered) = mpsc::sync_channel(1);
    let (release, on_release) = mpsc::channel();
    let mut miner = Miner::new();
    miner.subscribe(Arc::new(Gate {
        entered,
        release: std::sync::Mutex::new(on_release),
    }));
    let interface = JobInterface::new(miner);
    let parameters = MiningParameters::new(0.0, 0.0).expect("valid parameters");
    let handle = interface
        .start_mining(transactions(), parameters)
        .expect("job starts");

    on_entered.recv().expect("job reached the first stage");
    assert_eq!(interface.active_jobs().expect("registry lock"), vec![handle.id]);
    assert!(interface.cancel(handle.id).expect("registry lock"));
    release.send(()).expect("job is waiting");

    assert!(matches!(handle.join(), Err(BasketError::Cancelled)));
    assert!(interface.active_jobs().expect("registry lock").is_empty());
}

#[test]
fn handle_cancels_its_own_job() {
    let interface = JobInterface::default();
    let parameters = MiningParameters::new(0.0, 0.0).expect("valid parameters");
    let handle = interface
        .start_mining(transactions(), parameters)
        .expect("job starts");
    handle.cancel();
    // the job may have finished before observing the request
    match handle.join() {
        Ok(rules) => assert_eq!(rules.len(), 6),
        Err(e) => assert!(e.is_cancelled()),
    }
}
