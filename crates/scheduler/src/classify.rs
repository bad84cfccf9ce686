use joule_core::types::Task;
use joule_core::JouleError;

/// Rounds of assignment refinement before k-means gives up on convergence.
const MAX_ROUNDS: usize = 100;

/// A group of tasks with a similar power profile. Clusters come back ordered
/// light-to-heavy by aggregate observation sum.
#[derive(Debug, Clone)]
pub struct TaskCluster {
    pub tasks: Vec<Task>,
    size_score: usize,
}

impl TaskCluster {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Default feature extractor: the task's declared watts.
pub fn watts_observation(task: &Task) -> Vec<f64> {
    vec![task.watts]
}

/// Partition `tasks` into `k` clusters over the given feature extractor and
/// order them by aggregate feature sum ascending.
pub fn classify_tasks<F>(tasks: &[Task], k: usize, observe: F) -> Vec<TaskCluster>
where
    F: Fn(&Task) -> Vec<f64>,
{
    let observations: Vec<Vec<f64>> = tasks.iter().map(&observe).collect();
    let assignments = kmeans(&observations, k, MAX_ROUNDS);

    let mut clusters: Vec<TaskCluster> = (0..k)
        .map(|_| TaskCluster {
            tasks: Vec::new(),
            size_score: 0,
        })
        .collect();
    for (task, cluster) in tasks.iter().zip(assignments) {
        clusters[cluster].tasks.push(task.clone());
    }

    label_and_order(clusters, observe)
}

/// Aggregate feature sum, the ordering key for clusters.
fn cluster_size<F>(cluster: &TaskCluster, observe: &F) -> f64
where
    F: Fn(&Task) -> Vec<f64>,
{
    cluster
        .tasks
        .iter()
        .flat_map(|t| observe(t))
        .sum()
}

/// Score each cluster by how many others it outweighs, then order ascending.
/// Equal sizes advance both scores so the relative order stays stable.
fn label_and_order<F>(mut clusters: Vec<TaskCluster>, observe: F) -> Vec<TaskCluster>
where
    F: Fn(&Task) -> Vec<f64>,
{
    let sizes: Vec<f64> = clusters
        .iter()
        .map(|c| cluster_size(c, &observe))
        .collect();

    for i in 0..clusters.len() {
        for j in (i + 1)..clusters.len() {
            if sizes[i] > sizes[j] {
                clusters[i].size_score += 1;
            } else if sizes[j] > sizes[i] {
                clusters[j].size_score += 1;
            } else {
                clusters[i].size_score += 1;
                clusters[j].size_score += 1;
            }
        }
    }

    clusters.sort_by_key(|c| c.size_score);
    clusters
}

/// Ratio of heavy-cluster size to light-cluster size within the scheduling
/// window: the prefix of `tasks` covering `window_size` instances.
pub fn task_distribution(window_size: usize, tasks: &[Task]) -> Result<f64, JouleError> {
    if window_size == 0 {
        return Err(JouleError::InvalidWindow("window size is zero".into()));
    }

    let mut entries = 0;
    let mut covered = 0usize;
    for task in tasks {
        entries += 1;
        covered += task.instances as usize;
        if covered >= window_size {
            break;
        }
    }
    let window = &tasks[..entries];
    if window.is_empty() {
        return Err(JouleError::InvalidWindow("no pending tasks".into()));
    }

    let clusters: Vec<TaskCluster> = classify_tasks(window, 2, watts_observation)
        .into_iter()
        .filter(|c| !c.is_empty())
        .collect();
    if clusters.len() < 2 {
        return Err(JouleError::SingleCluster);
    }

    Ok(clusters[1].len() as f64 / clusters[0].len() as f64)
}

/// Plain k-means over the observations. Returns the cluster index of each
/// observation. Centroids initialize from the first `k` distinct observations
/// in first-occurrence order; assignment ties go to the lower index.
fn kmeans(observations: &[Vec<f64>], k: usize, max_rounds: usize) -> Vec<usize> {
    if observations.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);
    for obs in observations {
        if !centroids.contains(obs) {
            centroids.push(obs.clone());
            if centroids.len() == k {
                break;
            }
        }
    }
    // Fewer distinct observations than clusters: the surplus centroids
    // duplicate the first one and end up empty.
    while centroids.len() < k {
        centroids.push(observations[0].clone());
    }

    let mut assignments = vec![0usize; observations.len()];
    for _ in 0..max_rounds {
        let next: Vec<usize> = observations
            .iter()
            .map(|obs| nearest(obs, &centroids))
            .collect();
        let converged = next == assignments;
        assignments = next;

        for (index, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<&Vec<f64>> = observations
                .iter()
                .zip(&assignments)
                .filter(|(_, a)| **a == index)
                .map(|(o, _)| o)
                .collect();
            if members.is_empty() {
                continue;
            }
            for dim in 0..centroid.len() {
                centroid[dim] =
                    members.iter().map(|m| m[dim]).sum::<f64>() / members.len() as f64;
            }
        }

        if converged {
            break;
        }
    }
    assignments
}

fn nearest(observation: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (index, centroid) in centroids.iter().enumerate() {
        let distance: f64 = observation
            .iter()
            .zip(centroid)
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        if distance < best_distance {
            best_distance = distance;
            best = index;
        }
    }
    best
}
