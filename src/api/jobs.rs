use crate::transport::request::{Request, Response};
use crate::types::build::JobSummary;
use crate::{
    BuildNumber, BuildParameters, BuildRecord, BuildStatus, Error, JobPath, TriggeredBuild,
};

/// Field projection for a build status poll.
pub const BUILD_STATUS_TREE: &str =
    "building,result,number,url,timestamp,duration,estimatedDuration";
/// Field projection for a build's running flag and recorded parameters.
pub const BUILD_RECORD_TREE: &str = "building,actions[parameters[name,value]]";
/// Field projection for a job's latest build.
pub const LAST_BUILD_TREE: &str =
    "lastBuild[number,url,building,result,timestamp,duration,estimatedDuration]";

fn build_request(job: &JobPath, build: BuildNumber, tree: &str) -> Request {
    let build = build.to_string();
    Request::get(job.segments_with(&[build.as_str(), "api", "json"])).query_pair("tree", tree)
}

fn triggered_build_from_response(resp: &Response) -> TriggeredBuild {
    TriggeredBuild::from_parts(resp.status, resp.location())
}

/// Jenkins jobs/builds APIs (blocking).
#[derive(Clone)]
pub struct BlockingJobsService {
    client: crate::BlockingClient,
}

impl BlockingJobsService {
    pub(crate) fn new(client: crate::BlockingClient) -> Self {
        Self { client }
    }
}

impl BlockingJobsService {
    /// `GET /job/<name>/<build>/api/json?tree=building,result,...`
    pub fn build_status(&self, job: &JobPath, build: BuildNumber) -> Result<BuildStatus, Error> {
        self.client
            .send_json(build_request(job, build, BUILD_STATUS_TREE))
    }

    /// `GET /job/<name>/api/json?tree=lastBuild[...]`
    ///
    /// `None` when the job has never built.
    pub fn last_build(&self, job: &JobPath) -> Result<Option<BuildStatus>, Error> {
        let req = Request::get(job.segments_with(&["api", "json"]))
            .query_pair("tree", LAST_BUILD_TREE);
        let summary: JobSummary = self.client.send_json(req)?;
        Ok(summary.last_build)
    }

    /// `GET /job/<name>/<build>/api/json?tree=building,actions[parameters[name,value]]`
    pub fn build_record(&self, job: &JobPath, build: BuildNumber) -> Result<BuildRecord, Error> {
        self.client
            .send_json(build_request(job, build, BUILD_RECORD_TREE))
    }

    /// `POST /job/<name>/<build>/stop`
    pub fn stop_build(&self, job: &JobPath, build: BuildNumber) -> Result<TriggeredBuild, Error> {
        let build = build.to_string();
        let resp = self
            .client
            .send_response(Request::post(job.segments_with(&[build.as_str(), "stop"])))?;
        Ok(triggered_build_from_response(&resp))
    }

    /// `POST /job/<name>/<build>/rebuild` (rebuild plugin: same parameters).
    pub fn rebuild(&self, job: &JobPath, build: BuildNumber) -> Result<TriggeredBuild, Error> {
        let build = build.to_string();
        let resp = self
            .client
            .send_response(Request::post(job.segments_with(&[build.as_str(), "rebuild"])))?;
        Ok(triggered_build_from_response(&resp))
    }

    /// `POST /job/<name>/build`
    pub fn build(&self, job: &JobPath) -> Result<TriggeredBuild, Error> {
        let resp = self
            .client
            .send_response(Request::post(job.segments_with(&["build"])))?;
        Ok(triggered_build_from_response(&resp))
    }

    /// `POST /job/<name>/buildWithParameters`
    pub fn build_with_parameters(
        &self,
        job: &JobPath,
        params: &BuildParameters,
    ) -> Result<TriggeredBuild, Error> {
        let req =
            Request::post(job.segments_with(&["buildWithParameters"])).form_pairs(params.iter());
        let resp = self.client.send_response(req)?;
        Ok(triggered_build_from_response(&resp))
    }
}
